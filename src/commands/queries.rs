//! Commands that read from or write to the document store

use super::dates::{basis, parse_date, parse_roam_title};
use super::{CommandOutput, arg};
use crate::store::BlockRef;
use crate::template::CommandError;
use crate::workflow::Interpreter;
use chrono::NaiveDate;

/// Page title from `Title`, `[[Title]]` or `#Title`
fn page_title(value: &str) -> &str {
    let value = value.trim();
    if let Some(inner) = value.strip_prefix("[[").and_then(|v| v.strip_suffix("]]")) {
        return inner;
    }
    value.strip_prefix('#').unwrap_or(value)
}

/// Non-positive limits mean no limit
fn parse_limit(value: &str) -> Result<Option<usize>, CommandError> {
    let limit: i64 = value
        .trim()
        .parse()
        .map_err(|_| CommandError::invalid(format!("limit '{}' is not a number", value.trim())))?;
    Ok(usize::try_from(limit).ok().filter(|l| *l > 0))
}

fn block_links(refs: impl IntoIterator<Item = BlockRef>, limit: Option<usize>) -> CommandOutput {
    let lines = refs
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|r| format!("(({}))", r.uid))
        .collect();
    CommandOutput::Lines(lines)
}

/// `CURRENTPAGENAME`
pub async fn current_page_name(interp: &mut Interpreter) -> Result<CommandOutput, CommandError> {
    let target = interp.ctx.target_uid.clone();
    match interp.store().page_of(&target).await? {
        Some(title) => Ok(title.into()),
        None => {
            tracing::debug!(target = %target, "Target is not on a page");
            Ok(CommandOutput::empty())
        }
    }
}

/// `BLOCKMENTIONS:limit,title`, one block reference per line
pub async fn block_mentions(
    interp: &mut Interpreter,
    args: &[String],
) -> Result<CommandOutput, CommandError> {
    let limit = parse_limit(arg(args, 0))?;
    let title = page_title(arg(args, 1));
    if title.is_empty() {
        return Err(CommandError::invalid("BLOCKMENTIONS needs a page title"));
    }

    let refs = interp.store().references(title).await?;
    Ok(block_links(refs, limit))
}

/// Order of `BLOCKMENTIONSDATED` results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateSort {
    Asc,
    Desc,
    None,
}

impl DateSort {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "" | "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "NONE" => Some(Self::None),
            _ => None,
        }
    }
}

/// `BLOCKMENTIONSDATED:limit,title,start,end[,ASC|DESC|NONE]`
///
/// Only blocks that live on a daily note between `start` and `end`
/// (inclusive, either order) are listed.
pub async fn block_mentions_dated(
    interp: &mut Interpreter,
    args: &[String],
) -> Result<CommandOutput, CommandError> {
    let limit = parse_limit(arg(args, 0))?;
    let title = page_title(arg(args, 1));
    if title.is_empty() {
        return Err(CommandError::invalid("BLOCKMENTIONSDATED needs a page title"));
    }

    let today = basis(interp);
    let date = |index: usize| -> Result<NaiveDate, CommandError> {
        let value = arg(args, index);
        parse_date(value, today)
            .ok_or_else(|| CommandError::invalid(format!("could not understand date '{}'", value)))
    };
    let (start, end) = (date(2)?, date(3)?);
    let (from, to) = if start <= end { (start, end) } else { (end, start) };

    let sort = DateSort::parse(arg(args, 4))
        .ok_or_else(|| CommandError::invalid(format!("unknown sort '{}'", arg(args, 4))))?;

    let mut dated: Vec<(NaiveDate, BlockRef)> = interp
        .store()
        .references(title)
        .await?
        .into_iter()
        .filter_map(|r| {
            let day = parse_roam_title(r.page_title.as_deref()?)?;
            (from..=to).contains(&day).then_some((day, r))
        })
        .collect();

    match sort {
        DateSort::Asc => dated.sort_by_key(|(day, _)| *day),
        DateSort::Desc => dated.sort_by_key(|(day, _)| std::cmp::Reverse(*day)),
        DateSort::None => {}
    }

    Ok(block_links(dated.into_iter().map(|(_, r)| r), limit))
}

/// `PAGE:title` links to a page, creating it when missing
pub async fn page(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let title = page_title(arg(args, 0)).to_string();
    if title.is_empty() {
        return Err(CommandError::invalid("PAGE needs a title"));
    }
    if interp.store().find_page(&title).await?.is_none() {
        let uid = interp.store().create_page(&title).await?;
        tracing::debug!(uid = %uid, title = %title, "Page created for link");
    }
    Ok(format!("[[{}]]", title).into())
}
