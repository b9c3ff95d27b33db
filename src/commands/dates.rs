//! Date and time commands
//!
//! Dates default to daily-note page links such as `[[October 19th, 2026]]`.
//! Relative inputs resolve against the run's date basis (`DATEBASIS`) or today.

use super::{CommandOutput, arg};
use crate::template::CommandError;
use crate::workflow::Interpreter;
use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:in\s+)?(\d+)\s+(day|week|month|year)s?(\s+ago|\s+from\s+now)?$")
        .expect("valid relative date regex")
});

static ROAM_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$")
        .expect("valid page title regex")
});

/// "st", "nd", "rd" or "th" for a day of the month
pub fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Format `date` with a strftime pattern; `{ordinal}` renders the day suffix
pub fn format_date(date: NaiveDate, format: &str) -> Result<String, CommandError> {
    let format = format.replace("{ordinal}", ordinal_suffix(date.day()));
    let mut out = String::new();
    write!(out, "{}", date.format(&format))
        .map_err(|_| CommandError::invalid(format!("invalid date format '{}'", format)))?;
    Ok(out)
}

/// Daily-note title, e.g. "October 19th, 2026"
pub fn roam_title(date: NaiveDate) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%B"),
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

/// Parse a daily-note title back into a date
pub fn parse_roam_title(title: &str) -> Option<NaiveDate> {
    let lower = title.trim().to_lowercase();
    let caps = ROAM_TITLE.captures(&lower)?;
    let month = MONTHS.iter().position(|m| *m == &caps[1])? as u32 + 1;
    let day = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Days from `from` forward to the next `target` (1..=7)
fn days_until(from: Weekday, target: Weekday) -> u64 {
    let diff = (7 + target.num_days_from_monday() - from.num_days_from_monday()) % 7;
    if diff == 0 { 7 } else { diff as u64 }
}

/// Resolve a natural-language date relative to `basis`
pub fn parse_date(input: &str, basis: NaiveDate) -> Option<NaiveDate> {
    let text = input.trim().trim_start_matches("[[").trim_end_matches("]]");
    let lower = text.trim().to_lowercase();
    let lower = lower.split_whitespace().collect::<Vec<_>>().join(" ");

    match lower.as_str() {
        "" | "today" | "now" => return Some(basis),
        "tomorrow" => return basis.checked_add_days(Days::new(1)),
        "yesterday" => return basis.checked_sub_days(Days::new(1)),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&lower, "%Y-%m-%d") {
        return Some(date);
    }
    if let Some(date) = parse_roam_title(&lower) {
        return Some(date);
    }

    if let Some(caps) = RELATIVE.captures(&lower) {
        let n: u32 = caps[1].parse().ok()?;
        let past = caps.get(3).is_some_and(|m| m.as_str().trim() == "ago");
        return match (&caps[2], past) {
            ("day", false) => basis.checked_add_days(Days::new(n as u64)),
            ("day", true) => basis.checked_sub_days(Days::new(n as u64)),
            ("week", false) => basis.checked_add_days(Days::new(7 * n as u64)),
            ("week", true) => basis.checked_sub_days(Days::new(7 * n as u64)),
            ("month", false) => basis.checked_add_months(Months::new(n)),
            ("month", true) => basis.checked_sub_months(Months::new(n)),
            ("year", false) => basis.checked_add_months(Months::new(12 * n)),
            ("year", true) => basis.checked_sub_months(Months::new(12 * n)),
            _ => None,
        };
    }

    let (modifier, day) = match lower.split_once(' ') {
        Some((m @ ("next" | "last" | "this"), rest)) => (Some(m), rest),
        _ => (None, lower.as_str()),
    };
    let weekday = parse_weekday(day)?;
    let current = basis.weekday();
    match modifier {
        Some("last") => {
            let back = days_until(weekday, current);
            basis.checked_sub_days(Days::new(back))
        }
        Some("this") if weekday == current => Some(basis),
        // "next friday" and a bare "friday" both mean the coming one
        _ => basis.checked_add_days(Days::new(days_until(current, weekday))),
    }
}

/// Today, or the date `DATEBASIS` set for this run
pub fn basis(interp: &Interpreter) -> NaiveDate {
    interp
        .ctx
        .date_basis
        .unwrap_or_else(|| Local::now().date_naive())
}

fn resolve(interp: &Interpreter, input: &str) -> Result<NaiveDate, CommandError> {
    parse_date(input, basis(interp))
        .ok_or_else(|| CommandError::invalid(format!("could not understand date '{}'", input)))
}

/// Page link for a date, titled with the configured date format
pub fn page_link(interp: &Interpreter, date: NaiveDate) -> Result<String, CommandError> {
    let title = format_date(date, &interp.config().defaults.date_format)?;
    Ok(format!("[[{}]]", title))
}

/// `DATE:input[,format]`
pub fn date(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let date = resolve(interp, arg(args, 0))?;
    match args.get(1).map(|f| f.trim()).filter(|f| !f.is_empty()) {
        Some(format) => Ok(format_date(date, format)?.into()),
        None => Ok(page_link(interp, date)?.into()),
    }
}

/// `TODAY`, `TOMORROW` and `YESTERDAY`
pub fn offset_link(interp: &mut Interpreter, days: i64) -> Result<CommandOutput, CommandError> {
    let today = basis(interp);
    let date = if days >= 0 {
        today.checked_add_days(Days::new(days as u64))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    }
    .ok_or_else(|| CommandError::invalid("date out of range"))?;
    Ok(page_link(interp, date)?.into())
}

/// `TIME`, `TIMEAMPM` and the deprecated `CURRENTTIME`
pub fn time(twelve_hour: bool) -> CommandOutput {
    let now = Local::now();
    if twelve_hour {
        now.format("%-I:%M %p").to_string().into()
    } else {
        now.format("%H:%M").to_string().into()
    }
}

/// `DATEBASIS:input` moves "today" for the rest of the run
pub fn date_basis(interp: &mut Interpreter, args: &[String]) -> Result<CommandOutput, CommandError> {
    let date = resolve(interp, arg(args, 0))?;
    tracing::debug!(basis = %date, "Date basis set");
    interp.ctx.date_basis = Some(date);
    Ok(CommandOutput::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{expand, interpreter};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // A Monday
    fn monday() -> NaiveDate {
        d(2026, 10, 19)
    }

    #[test]
    fn test_ordinal_suffix() {
        let suffixes: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31]
            .into_iter()
            .map(ordinal_suffix)
            .collect();
        assert_eq!(
            suffixes,
            vec!["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd", "st"]
        );
    }

    #[test]
    fn test_roam_title_round_trip() {
        assert_eq!(roam_title(monday()), "October 19th, 2026");
        assert_eq!(parse_roam_title("October 19th, 2026"), Some(monday()));
        assert_eq!(parse_roam_title("march 1st, 2024"), Some(d(2024, 3, 1)));
        assert_eq!(parse_roam_title("Smarch 1st, 2024"), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(
            format_date(monday(), "%B %-d{ordinal}, %Y").unwrap(),
            "October 19th, 2026"
        );
        assert_eq!(format_date(monday(), "%Y/%m/%d").unwrap(), "2026/10/19");
        assert!(format_date(monday(), "%Q").is_err());
    }

    #[test]
    fn test_parse_simple_words() {
        assert_eq!(parse_date("today", monday()), Some(monday()));
        assert_eq!(parse_date("", monday()), Some(monday()));
        assert_eq!(parse_date("Tomorrow", monday()), Some(d(2026, 10, 20)));
        assert_eq!(parse_date("yesterday", monday()), Some(d(2026, 10, 18)));
        assert_eq!(parse_date("2024-02-29", monday()), Some(d(2024, 2, 29)));
        assert_eq!(
            parse_date("[[November 1st, 2026]]", monday()),
            Some(d(2026, 11, 1))
        );
        assert_eq!(parse_date("whenever", monday()), None);
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(parse_date("in 3 days", monday()), Some(d(2026, 10, 22)));
        assert_eq!(parse_date("2 weeks ago", monday()), Some(d(2026, 10, 5)));
        assert_eq!(parse_date("in 1 month", monday()), Some(d(2026, 11, 19)));
        assert_eq!(parse_date("1 year ago", monday()), Some(d(2025, 10, 19)));
    }

    #[test]
    fn test_parse_weekdays() {
        assert_eq!(parse_date("friday", monday()), Some(d(2026, 10, 23)));
        assert_eq!(parse_date("next monday", monday()), Some(d(2026, 10, 26)));
        assert_eq!(parse_date("last friday", monday()), Some(d(2026, 10, 16)));
        assert_eq!(parse_date("last monday", monday()), Some(d(2026, 10, 12)));
        assert_eq!(parse_date("this monday", monday()), Some(monday()));
    }

    #[tokio::test]
    async fn test_date_commands_use_basis() {
        let mut interp = interpreter();
        interp.ctx.date_basis = Some(monday());

        assert_eq!(expand(&mut interp, "<%DATE%>").await, "[[October 19th, 2026]]");
        assert_eq!(expand(&mut interp, "<%TOMORROW%>").await, "[[October 20th, 2026]]");
        assert_eq!(expand(&mut interp, "<%YESTERDAY%>").await, "[[October 18th, 2026]]");
        assert_eq!(
            expand(&mut interp, "<%DATE:in 2 days,%Y-%m-%d%>").await,
            "2026-10-21"
        );
    }

    #[tokio::test]
    async fn test_datebasis_command() {
        let mut interp = interpreter();
        let text = expand(&mut interp, "<%DATEBASIS:2024-01-31%><%TODAY%>").await;
        assert_eq!(text, "[[January 31st, 2024]]");
    }

    #[tokio::test]
    async fn test_bad_date_is_error() {
        let mut interp = interpreter();
        assert!(interp.expand("<%DATE:someday maybe%>", true).await.is_err());
    }

    #[tokio::test]
    async fn test_time_shapes() {
        let mut interp = interpreter();
        let time = expand(&mut interp, "<%TIME%>").await;
        assert_eq!(time.len(), 5);
        assert_eq!(&time[2..3], ":");
        let ampm = expand(&mut interp, "<%TIMEAMPM%>").await;
        assert!(ampm.ends_with("AM") || ampm.ends_with("PM"));
    }
}
