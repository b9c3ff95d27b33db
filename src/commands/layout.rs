//! Block flow and attribute commands

use super::{CommandOutput, arg, expansion_nodes};
use crate::node::{TextAlign, ViewType};
use crate::template::CommandError;
use crate::workflow::{ExitBlock, Interpreter};

/// Most blocks a single `REPEAT` may produce
const MAX_REPEAT: usize = 1000;

/// `EXIT`: keep this block, skip everything after it
pub fn exit(interp: &mut Interpreter) -> Result<CommandOutput, CommandError> {
    interp.ctx.exit_workflow = true;
    Ok(CommandOutput::empty())
}

/// `NOBLOCKOUTPUT`
pub fn no_block_output(interp: &mut Interpreter) -> Result<CommandOutput, CommandError> {
    interp.ctx.exit_block = ExitBlock::Yes;
    Ok(CommandOutput::empty())
}

/// `EXITBLOCK[:yes|no|end|empty|childless]`
pub fn exit_block(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let policy = ExitBlock::parse(arg(args, 0)).ok_or_else(|| {
        CommandError::invalid(format!(
            "EXITBLOCK expects yes, no, end, empty or childless, got '{}'",
            arg(args, 0)
        ))
    })?;
    interp.ctx.exit_block = policy;
    Ok(CommandOutput::empty())
}

/// `INDENT` and `UNINDENT` mark the block being generated
pub fn indent(interp: &mut Interpreter, deeper: bool) -> Result<CommandOutput, CommandError> {
    let uid = interp.ctx.current_uid.clone();
    if deeper {
        interp.ctx.indent.insert(uid);
    } else {
        interp.ctx.unindent.insert(uid);
    }
    Ok(CommandOutput::empty())
}

/// `REPEAT:count,content`
///
/// Content is everything after the first comma, kept raw, and expanded once
/// per copy, so commands inside it run each time.
/// The first copy lands in the current block and the rest follow as siblings.
pub async fn repeat(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let count_arg = interp.expand_text(arg(args, 0)).await?;
    let count: usize = count_arg
        .trim()
        .parse()
        .map_err(|_| CommandError::invalid(format!("REPEAT count '{}' is not a number", count_arg)))?;
    if count > MAX_REPEAT {
        return Err(CommandError::invalid(format!(
            "REPEAT count {} exceeds {}",
            count, MAX_REPEAT
        )));
    }

    let content = arg(args, 1);
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        let expansion = interp.expand(content, false).await?;
        nodes.extend(expansion_nodes(expansion));
    }
    Ok(CommandOutput::Nodes(nodes))
}

/// `HEADING:0..3`; 0 clears the heading
pub fn heading(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let value = arg(args, 0).trim();
    let level: u8 = value
        .parse()
        .ok()
        .filter(|level| *level <= 3)
        .ok_or_else(|| CommandError::invalid(format!("heading '{}' is not 0 to 3", value)))?;
    interp.ctx.pending_props.heading = Some(level);
    Ok(CommandOutput::empty())
}

/// `TEXTALIGN:left|center|right|justify`
pub fn text_align(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let align = TextAlign::parse(arg(args, 0))
        .ok_or_else(|| CommandError::invalid(format!("unknown alignment '{}'", arg(args, 0))))?;
    interp.ctx.pending_props.text_align = Some(align);
    Ok(CommandOutput::empty())
}

/// `VIEWTYPE:bullet|numbered|document`
pub fn view_type(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let view = ViewType::parse(arg(args, 0))
        .ok_or_else(|| CommandError::invalid(format!("unknown view type '{}'", arg(args, 0))))?;
    interp.ctx.pending_props.view_type = Some(view);
    Ok(CommandOutput::empty())
}

/// `COLLAPSE` and `EXPAND`
pub fn set_open(interp: &mut Interpreter, open: bool) -> Result<CommandOutput, CommandError> {
    interp.ctx.pending_props.open = Some(open);
    Ok(CommandOutput::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{expand, interpreter};

    #[tokio::test]
    async fn test_exit_and_no_output_flags() {
        let mut interp = interpreter();
        expand(&mut interp, "<%EXIT%>").await;
        assert!(interp.ctx.exit_workflow);

        expand(&mut interp, "<%NOBLOCKOUTPUT%>").await;
        assert_eq!(interp.ctx.exit_block, ExitBlock::Yes);
    }

    #[tokio::test]
    async fn test_exit_block_policies() {
        let mut interp = interpreter();
        expand(&mut interp, "<%EXITBLOCK%>").await;
        assert_eq!(interp.ctx.exit_block, ExitBlock::Yes);
        expand(&mut interp, "<%EXITBLOCK:Childless%>").await;
        assert_eq!(interp.ctx.exit_block, ExitBlock::Childless);
        expand(&mut interp, "<%EXITBLOCK:no%>").await;
        assert_eq!(interp.ctx.exit_block, ExitBlock::No);
        assert!(interp.expand("<%EXITBLOCK:maybe%>", true).await.is_err());
    }

    #[tokio::test]
    async fn test_indent_marks_current_block() {
        let mut interp = interpreter();
        expand(&mut interp, "<%INDENT%><%UNINDENT%>").await;
        assert!(interp.ctx.indent.contains("current"));
        assert!(interp.ctx.unindent.contains("current"));
    }

    #[tokio::test]
    async fn test_repeat_runs_content_each_time() {
        let mut interp = interpreter();
        interp.ctx.set_variable("n", "0");
        let expansion = interp
            .expand("<%REPEAT:3,n=<%GET:n%><%SET:n,1%>%>", true)
            .await
            .unwrap();
        assert_eq!(expansion.text, "n=0");
        assert_eq!(expansion.next_blocks.len(), 2);
        assert_eq!(expansion.next_blocks[1].text, "n=1");
    }

    #[tokio::test]
    async fn test_repeat_count_from_variable() {
        let mut interp = interpreter();
        interp.ctx.set_variable("times", "2");
        let expansion = interp
            .expand("<%REPEAT:<%GET:times%>,a,b%>", true)
            .await
            .unwrap();
        assert_eq!(expansion.text, "a,b");
        assert_eq!(expansion.next_blocks.len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_content_keeps_escapes() {
        let mut interp = interpreter();
        let expansion = interp.expand(r"<%REPEAT:2,a\,b%>", true).await.unwrap();
        assert_eq!(expansion.text, r"a\,b");
        assert_eq!(expansion.next_blocks[0].text, r"a\,b");
    }

    #[tokio::test]
    async fn test_repeat_zero_and_invalid() {
        let mut interp = interpreter();
        assert_eq!(expand(&mut interp, "x<%REPEAT:0,y%>").await, "x");
        assert!(interp.expand("<%REPEAT:lots,y%>", true).await.is_err());
        assert!(interp.expand("<%REPEAT:5000,y%>", true).await.is_err());
    }

    #[tokio::test]
    async fn test_heading_range() {
        let mut interp = interpreter();
        expand(&mut interp, "<%HEADING:3%>").await;
        assert_eq!(interp.ctx.pending_props.heading, Some(3));
        assert!(interp.expand("<%HEADING:4%>", true).await.is_err());
        assert!(interp.expand("<%HEADING:nine%>", true).await.is_err());
    }

    #[tokio::test]
    async fn test_attribute_commands() {
        let mut interp = interpreter();
        expand(&mut interp, "<%TEXTALIGN:Center%><%VIEWTYPE:numbered%><%EXPAND%>").await;
        assert_eq!(interp.ctx.pending_props.text_align, Some(TextAlign::Center));
        assert_eq!(interp.ctx.pending_props.view_type, Some(ViewType::Numbered));
        assert_eq!(interp.ctx.pending_props.open, Some(true));

        assert!(interp.expand("<%TEXTALIGN:middle%>", true).await.is_err());
        assert!(interp.expand("<%VIEWTYPE:grid%>", true).await.is_err());
    }
}
