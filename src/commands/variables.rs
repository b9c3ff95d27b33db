//! Variable commands

use super::{CommandOutput, arg};
use crate::template::CommandError;
use crate::workflow::Interpreter;

/// `SET:name,value`; extra arguments are part of the value
pub fn set(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let name = arg(args, 0).trim();
    if name.is_empty() {
        return Err(CommandError::invalid("SET needs a variable name"));
    }
    let value = args.get(1..).map(|rest| rest.join(",")).unwrap_or_default();
    interp.ctx.set_variable(name, value);
    Ok(CommandOutput::empty())
}

/// `GET:name`
pub fn get(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let name = arg(args, 0).trim();
    let value = match interp.ctx.variable(name) {
        Some(value) => value.to_string(),
        None => format!("--> Variable {} not SET <--", name),
    };
    Ok(value.into())
}

/// `CLEARVARS`
pub fn clear(interp: &mut Interpreter) -> Result<CommandOutput, CommandError> {
    interp.ctx.variables.clear();
    Ok(CommandOutput::empty())
}

#[cfg(test)]
mod tests {
    use crate::workflow::testing::{expand, interpreter};

    #[tokio::test]
    async fn test_set_then_get() {
        let mut interp = interpreter();
        assert_eq!(expand(&mut interp, "<%SET:x,foo%><%GET:x%>").await, "foo");
    }

    #[tokio::test]
    async fn test_get_unset_sentinel() {
        let mut interp = interpreter();
        assert_eq!(
            expand(&mut interp, "<%GET:x%>").await,
            "--> Variable x not SET <--"
        );
    }

    #[tokio::test]
    async fn test_set_value_with_commas() {
        let mut interp = interpreter();
        expand(&mut interp, "<%SET:list,a,b%><%SET:escaped,c\\,d%>").await;
        assert_eq!(interp.ctx.variable("list"), Some("a,b"));
        assert_eq!(interp.ctx.variable("escaped"), Some("c,d"));
    }

    #[tokio::test]
    async fn test_set_without_name_fails() {
        let mut interp = interpreter();
        assert!(interp.expand("<%SET:,x%>", true).await.is_err());
    }

    #[tokio::test]
    async fn test_clearvars() {
        let mut interp = interpreter();
        let text = expand(&mut interp, "<%SET:x,1%><%CLEARVARS%><%GET:x%>").await;
        assert_eq!(text, "--> Variable x not SET <--");
    }
}
