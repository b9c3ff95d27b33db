//! Commands that talk to the host: cursor, navigation, prompts and toasts

use super::{CommandOutput, arg};
use crate::host::PromptRequest;
use crate::template::CommandError;
use crate::workflow::{AfterRunEffect, CursorPosition, Interpreter};
use rand::Rng;

/// Separates label, default and options in `INPUT`
const INPUT_SEPARATOR: &str = "%%";

/// `CURSOR`: remember where the caret goes once the run is done
pub fn cursor(interp: &mut Interpreter) -> Result<CommandOutput, CommandError> {
    interp.ctx.cursor_position = Some(CursorPosition {
        uid: interp.ctx.current_uid.clone(),
        offset: interp.ctx.current_content.chars().count(),
    });
    Ok(CommandOutput::empty())
}

/// `FOCUSONBLOCK`
pub fn focus_on_block(interp: &mut Interpreter) -> Result<CommandOutput, CommandError> {
    interp.ctx.focus_on_block = Some(interp.ctx.current_uid.clone());
    Ok(CommandOutput::empty())
}

/// `OPENPAGE:title` or `OPENPAGE:((uid))`, queued until the run has been written
pub fn open_page(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let target = arg(args, 0).trim();
    if target.is_empty() {
        return Err(CommandError::invalid("OPENPAGE needs a page title or block reference"));
    }

    let effect = match target
        .strip_prefix("((")
        .and_then(|rest| rest.strip_suffix("))"))
    {
        Some(uid) => AfterRunEffect::OpenBlock(uid.to_string()),
        None => {
            let title = target
                .strip_prefix("[[")
                .and_then(|rest| rest.strip_suffix("]]"))
                .unwrap_or(target);
            AfterRunEffect::OpenPage(title.to_string())
        }
    };
    interp.ctx.after_run.push(effect);
    Ok(CommandOutput::empty())
}

/// `INPUT:label%%default%%option%%option`
///
/// Cancelling the prompt stops the whole run.
pub async fn input(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let payload = args.join(",");
    let mut parts = payload.split(INPUT_SEPARATOR).map(str::to_string);
    let request = PromptRequest {
        label: parts.next().unwrap_or_default(),
        default: parts.next().unwrap_or_default(),
        options: parts.collect(),
    };

    let label = request.label.clone();
    match interp.host().prompter.prompt(request).await {
        Some(answer) => Ok(answer.into()),
        None => {
            interp.ctx.exit_workflow = true;
            Err(CommandError::PromptCancelled { label })
        }
    }
}

/// `NOTIFICATION:seconds,message`
pub fn notification(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let seconds_arg = arg(args, 0).trim();
    let seconds: u64 = seconds_arg.parse().map_err(|_| {
        CommandError::invalid(format!("notification seconds '{}' is not a number", seconds_arg))
    })?;
    let message = args.get(1..).map(|rest| rest.join(",")).unwrap_or_default();
    interp.host().notifier.notify(&message, seconds);
    Ok(CommandOutput::empty())
}

/// `RANDOMNUMBER:min,max`, both inclusive
pub fn random_number(args: &[String]) -> Result<CommandOutput, CommandError> {
    let bound = |index: usize| -> Result<i64, CommandError> {
        let value = arg(args, index).trim();
        value
            .parse()
            .map_err(|_| CommandError::invalid(format!("'{}' is not an integer", value)))
    };
    let (min, max) = (bound(0)?, bound(1)?);
    if min > max {
        return Err(CommandError::invalid(format!(
            "RANDOMNUMBER min {} is greater than max {}",
            min, max
        )));
    }
    Ok(rand::rng().random_range(min..=max).to_string().into())
}
