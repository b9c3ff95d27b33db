//! Argument splitting for command payloads
//!
//! A payload splits on top-level commas. Commas inside nested `<% %>` markers
//! or `[[page]]` references belong to the argument that contains them, and
//! `\,` at the top level is a literal comma with the backslash removed.

use super::tokenizer::{CLOSE, ESCAPE, OPEN, starts_with_at};
use regex::Regex;
use std::sync::LazyLock;

/// How a command's payload is turned into arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgPolicy {
    /// Split on top-level commas
    #[default]
    Standard,
    /// Standard split, then rejoin `Month Dth` + `YYYY` pairs into one date.
    /// Only `BLOCKMENTIONSDATED` uses this.
    CoalesceDates,
    /// Split off this many leading arguments; the rest of the payload is
    /// passed through untouched as the last argument, escapes included
    Leading(usize),
}

impl ArgPolicy {
    pub fn split(&self, payload: &str) -> Vec<String> {
        match self {
            ArgPolicy::Standard => split_args(payload),
            ArgPolicy::CoalesceDates => coalesce_dates(split_args(payload)),
            ArgPolicy::Leading(count) => split_limited(payload, Some(*count)),
        }
    }
}

/// Split a payload on top-level commas
pub fn split_args(payload: &str) -> Vec<String> {
    split_limited(payload, None)
}

fn split_limited(payload: &str, limit: Option<usize>) -> Vec<String> {
    let bytes = payload.as_bytes();
    let mut args = Vec::new();
    let mut current = String::new();
    let mut marker_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut segment_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let top_level = marker_depth == 0 && bracket_depth == 0;

        if bytes[i] == ESCAPE {
            if top_level && bytes.get(i + 1) == Some(&b',') {
                current.push_str(&payload[segment_start..i]);
                current.push(',');
                segment_start = i + 2;
            }
            i += 2;
        } else if starts_with_at(bytes, i, OPEN) {
            marker_depth += 1;
            i += OPEN.len();
        } else if marker_depth > 0 && starts_with_at(bytes, i, CLOSE) {
            marker_depth -= 1;
            i += CLOSE.len();
        } else if starts_with_at(bytes, i, "[[") {
            bracket_depth += 1;
            i += 2;
        } else if bracket_depth > 0 && starts_with_at(bytes, i, "]]") {
            bracket_depth -= 1;
            i += 2;
        } else if top_level && bytes[i] == b',' {
            current.push_str(&payload[segment_start..i]);
            args.push(std::mem::take(&mut current));
            i += 1;
            segment_start = i;
            if limit.is_some_and(|limit| args.len() >= limit) {
                args.push(payload[i..].to_string());
                return args;
            }
        } else {
            i += 1;
        }
    }

    current.push_str(&payload[segment_start.min(payload.len())..]);
    args.push(current);
    args
}

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(st|nd|rd|th)?\s*$",
    )
    .expect("valid month-day pattern")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{4}\s*$").expect("valid year pattern"));

/// Rejoin date titles that the comma split tore apart
fn coalesce_dates(args: Vec<String>) -> Vec<String> {
    let mut merged = Vec::with_capacity(args.len());
    let mut iter = args.into_iter().peekable();

    while let Some(arg) = iter.next() {
        let next_is_year = iter.peek().is_some_and(|next| YEAR.is_match(next));
        if MONTH_DAY.is_match(&arg) && next_is_year {
            let year = iter.next().unwrap_or_default();
            merged.push(format!("{},{}", arg, year));
        } else {
            merged.push(arg);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_split() {
        assert_eq!(split_args("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_args("single"), vec!["single"]);
        assert_eq!(split_args(""), vec![""]);
    }

    #[test]
    fn test_leading_policy_keeps_rest_raw() {
        assert_eq!(
            ArgPolicy::Leading(1).split(r"3,a\,b,<%GET:x%>"),
            vec!["3", r"a\,b,<%GET:x%>"]
        );
        assert_eq!(ArgPolicy::Leading(1).split("3"), vec!["3"]);
        assert_eq!(ArgPolicy::Leading(1).split("<%GET:n%>,x"), vec!["<%GET:n%>", "x"]);
    }

    #[test]
    fn test_keeps_whitespace_and_empty_args() {
        assert_eq!(split_args("x, y,,"), vec!["x", " y", "", ""]);
    }

    #[test]
    fn test_nested_marker_is_opaque() {
        assert_eq!(
            split_args("one,<%RANDOMNUMBER:1,10%>,two"),
            vec!["one", "<%RANDOMNUMBER:1,10%>", "two"]
        );
        assert_eq!(
            split_args("<%A:<%B:1,2%>,3%>,4"),
            vec!["<%A:<%B:1,2%>,3%>", "4"]
        );
    }

    #[test]
    fn test_escaped_comma() {
        assert_eq!(split_args("a\\,b,c"), vec!["a,b", "c"]);
        assert_eq!(split_args("\\,lead"), vec![",lead"]);
    }

    #[test]
    fn test_escape_inside_nested_marker_is_kept() {
        assert_eq!(
            split_args("<%SET:x,a\\,b%>,z"),
            vec!["<%SET:x,a\\,b%>", "z"]
        );
    }

    #[test]
    fn test_other_escapes_are_untouched() {
        assert_eq!(split_args("a\\nb,c"), vec!["a\\nb", "c"]);
    }

    #[test]
    fn test_page_reference_is_opaque() {
        assert_eq!(
            split_args("5,[[Smith, John]],x"),
            vec!["5", "[[Smith, John]]", "x"]
        );
    }

    #[test]
    fn test_stray_close_at_top_level() {
        assert_eq!(split_args("a%>,b"), vec!["a%>", "b"]);
    }

    #[test]
    fn test_standard_policy_splits_dates() {
        let args = ArgPolicy::Standard.split("10,Project,October 1st, 2026");
        assert_eq!(args, vec!["10", "Project", "October 1st", " 2026"]);
    }

    #[test]
    fn test_coalesce_dates_policy() {
        let args = ArgPolicy::CoalesceDates
            .split("10,Project,October 1st, 2026,November 3rd, 2026,DESC");
        assert_eq!(
            args,
            vec![
                "10",
                "Project",
                "October 1st, 2026",
                "November 3rd, 2026",
                "DESC"
            ]
        );
    }

    #[test]
    fn test_coalesce_leaves_non_dates() {
        let args = ArgPolicy::CoalesceDates.split("5,Meeting,today,2026");
        assert_eq!(args, vec!["5", "Meeting", "today", "2026"]);
    }
}
