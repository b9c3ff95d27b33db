//! Conditional commands
//!
//! The `IF*` guards drop the current block by setting its exit policy.
//! `IF` instead records a result that later `THEN` and `ELSE` in the same
//! block consult.

use super::{CommandOutput, arg, dates, expansion_nodes};
use crate::template::{CommandError, evaluate_condition};
use crate::workflow::{ExitBlock, Interpreter};
use chrono::Datelike;
use regex::RegexBuilder;

fn drop_block_unless(interp: &mut Interpreter, keep: bool) -> Result<CommandOutput, CommandError> {
    if !keep {
        interp.ctx.exit_block = ExitBlock::Yes;
    }
    Ok(CommandOutput::empty())
}

/// `/pattern/flags` as a regex; only the `i` flag is understood
fn regex_literal(value: &str) -> Result<Option<regex::Regex>, CommandError> {
    let Some(body) = value.strip_prefix('/') else {
        return Ok(None);
    };
    let Some((pattern, flags)) = body.rsplit_once('/') else {
        return Ok(None);
    };

    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .build()
        .map(Some)
        .map_err(|e| CommandError::invalid(format!("invalid regex '{}': {}", value, e)))
}

/// `IFVAR:name[,value]`
///
/// An unset variable leaves the block alone. Otherwise the block is dropped
/// when the value differs, when a `/regex/` does not match, or when no value
/// is given and the variable is empty.
pub fn if_var(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let name = arg(args, 0).trim();
    let Some(current) = interp.ctx.variable(name).map(str::to_string) else {
        return Ok(CommandOutput::empty());
    };

    let expected = args.get(1..).map(|rest| rest.join(",")).unwrap_or_default();
    let keep = if expected.is_empty() {
        !current.is_empty()
    } else if let Some(pattern) = regex_literal(&expected)? {
        pattern.is_match(&current)
    } else {
        current == expected
    };

    drop_block_unless(interp, keep)
}

/// `IFTRUE:expression`
pub fn if_true(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let keep = evaluate_condition(&args.join(","), &interp.ctx.variables)?;
    drop_block_unless(interp, keep)
}

fn weekday_number(value: &str) -> Option<u32> {
    let value = value.trim().to_lowercase();
    if let Ok(n) = value.parse::<u32>() {
        return (1..=7).contains(&n).then_some(n);
    }
    let index = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
        .iter()
        .position(|prefix| value.starts_with(prefix))?;
    Some(index as u32 + 1)
}

/// `IFDAYOFWEEK:1,3,5`, Monday is 1; day names work too
pub fn if_day_of_week(
    interp: &mut Interpreter,
    args: &[String],
) -> Result<CommandOutput, CommandError> {
    let today = dates::basis(interp).weekday().number_from_monday();
    let mut keep = false;
    for value in args.iter().filter(|a| !a.trim().is_empty()) {
        let day = weekday_number(value)
            .ok_or_else(|| CommandError::invalid(format!("'{}' is not a weekday", value)))?;
        keep |= day == today;
    }
    drop_block_unless(interp, keep)
}

/// `IFDAYOFMONTH:1,15`
pub fn if_day_of_month(
    interp: &mut Interpreter,
    args: &[String],
) -> Result<CommandOutput, CommandError> {
    let today = dates::basis(interp).day();
    let mut keep = false;
    for value in args.iter().filter(|a| !a.trim().is_empty()) {
        let day: u32 = value
            .trim()
            .parse()
            .ok()
            .filter(|d| (1..=31).contains(d))
            .ok_or_else(|| CommandError::invalid(format!("'{}' is not a day of the month", value)))?;
        keep |= day == today;
    }
    drop_block_unless(interp, keep)
}

/// `IF:expression`
pub fn if_expr(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let result = evaluate_condition(&args.join(","), &interp.ctx.variables)?;
    interp.ctx.if_state = Some(result);
    Ok(CommandOutput::empty())
}

/// `THEN:content` and `ELSE:content`; content expands only on its branch
pub async fn branch(
    interp: &mut Interpreter,
    args: &[String],
    when: bool,
) -> Result<CommandOutput, CommandError> {
    if interp.ctx.if_state != Some(when) {
        return Ok(CommandOutput::empty());
    }
    let content = args.join(",");
    let expansion = interp.expand(&content, false).await?;
    Ok(CommandOutput::Nodes(expansion_nodes(expansion)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{expand, interpreter};
    use chrono::NaiveDate;

    async fn exits(text: &str, vars: &[(&str, &str)]) -> bool {
        let mut interp = interpreter();
        for (k, v) in vars {
            interp.ctx.set_variable(*k, *v);
        }
        interp.expand(text, true).await.unwrap();
        interp.ctx.exit_block == ExitBlock::Yes
    }

    #[tokio::test]
    async fn test_ifvar_unset_has_no_effect() {
        assert!(!exits("<%IFVAR:x,bar%>rest", &[]).await);
        assert!(!exits("<%IFVAR:x%>rest", &[]).await);
    }

    #[tokio::test]
    async fn test_ifvar_compares() {
        assert!(exits("<%IFVAR:x,bar%>", &[("x", "baz")]).await);
        assert!(!exits("<%IFVAR:x,bar%>", &[("x", "bar")]).await);
    }

    #[tokio::test]
    async fn test_ifvar_empty_value() {
        assert!(exits("<%IFVAR:x%>", &[("x", "")]).await);
        assert!(!exits("<%IFVAR:x%>", &[("x", "something")]).await);
    }

    #[tokio::test]
    async fn test_ifvar_regex() {
        assert!(!exits("<%IFVAR:x,/^ba/%>", &[("x", "baz")]).await);
        assert!(exits("<%IFVAR:x,/^qu/%>", &[("x", "baz")]).await);
        assert!(!exits("<%IFVAR:x,/^BA/i%>", &[("x", "baz")]).await);
    }

    #[tokio::test]
    async fn test_iftrue() {
        assert!(!exits("<%IFTRUE:n > 3%>", &[("n", "5")]).await);
        assert!(exits("<%IFTRUE:n > 3%>", &[("n", "2")]).await);
        assert!(exits("<%IFTRUE:<%GET:n%> == 1%>", &[("n", "2")]).await);
    }

    #[tokio::test]
    async fn test_day_guards_use_basis() {
        let mut interp = interpreter();
        // Monday the 19th
        interp.ctx.date_basis = NaiveDate::from_ymd_opt(2026, 10, 19);

        interp.expand("<%IFDAYOFWEEK:1,3%>", true).await.unwrap();
        assert_eq!(interp.ctx.exit_block, ExitBlock::No);
        interp.expand("<%IFDAYOFWEEK:tuesday%>", true).await.unwrap();
        assert_eq!(interp.ctx.exit_block, ExitBlock::Yes);

        interp.ctx.exit_block = ExitBlock::No;
        interp.expand("<%IFDAYOFMONTH:19%>", true).await.unwrap();
        assert_eq!(interp.ctx.exit_block, ExitBlock::No);
        interp.expand("<%IFDAYOFMONTH:1,15%>", true).await.unwrap();
        assert_eq!(interp.ctx.exit_block, ExitBlock::Yes);

        assert!(interp.expand("<%IFDAYOFWEEK:9%>", true).await.is_err());
    }

    #[tokio::test]
    async fn test_if_then_else() {
        let mut interp = interpreter();
        interp.ctx.set_variable("n", "5");
        let text = expand(
            &mut interp,
            "<%IF:n > 3%><%THEN:big <%GET:n%>%><%ELSE:small<%SET:touched,1%>%>",
        )
        .await;
        assert_eq!(text, "big 5");
        // The untaken branch never ran
        assert_eq!(interp.ctx.variable("touched"), None);
    }

    #[tokio::test]
    async fn test_else_branch() {
        let mut interp = interpreter();
        let text = expand(&mut interp, "<%IF:false%><%THEN:yes%><%ELSE:no, really%>").await;
        assert_eq!(text, "no, really");
    }

    #[tokio::test]
    async fn test_then_without_if() {
        let mut interp = interpreter();
        assert_eq!(expand(&mut interp, "<%THEN:x%>").await, "");
    }
}
