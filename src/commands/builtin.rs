//! Built-in command catalog

use super::registry::{Command, CommandHandler, CommandOutput};
use super::{arg, dates, interaction, layout, logic, queries, variables};
use crate::template::{ArgPolicy, CommandError};
use crate::workflow::Interpreter;
use async_trait::async_trait;

/// Every command the engine ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Dates
    Date,
    Today,
    Tomorrow,
    Yesterday,
    Time,
    TimeAmPm,
    DateBasis,
    CurrentTime,
    // Variables
    Set,
    Get,
    ClearVars,
    // Conditionals
    IfVar,
    IfTrue,
    IfDayOfWeek,
    IfDayOfMonth,
    If,
    Then,
    Else,
    // Flow and layout
    Exit,
    NoBlockOutput,
    ExitBlock,
    Indent,
    Unindent,
    Repeat,
    Heading,
    TextAlign,
    ViewType,
    Collapse,
    Expand,
    // Cursor and navigation
    Cursor,
    FocusOnBlock,
    OpenPage,
    CurrentBlockRef,
    CurrentPageName,
    // Store queries
    BlockMentions,
    BlockMentionsDated,
    Page,
    // Interaction
    Input,
    Notification,
    RandomNumber,
    // Sub-workflows
    SmartBlock,
}

impl Builtin {
    pub const ALL: [Builtin; 41] = [
        Self::Date,
        Self::Today,
        Self::Tomorrow,
        Self::Yesterday,
        Self::Time,
        Self::TimeAmPm,
        Self::DateBasis,
        Self::CurrentTime,
        Self::Set,
        Self::Get,
        Self::ClearVars,
        Self::IfVar,
        Self::IfTrue,
        Self::IfDayOfWeek,
        Self::IfDayOfMonth,
        Self::If,
        Self::Then,
        Self::Else,
        Self::Exit,
        Self::NoBlockOutput,
        Self::ExitBlock,
        Self::Indent,
        Self::Unindent,
        Self::Repeat,
        Self::Heading,
        Self::TextAlign,
        Self::ViewType,
        Self::Collapse,
        Self::Expand,
        Self::Cursor,
        Self::FocusOnBlock,
        Self::OpenPage,
        Self::CurrentBlockRef,
        Self::CurrentPageName,
        Self::BlockMentions,
        Self::BlockMentionsDated,
        Self::Page,
        Self::Input,
        Self::Notification,
        Self::RandomNumber,
        Self::SmartBlock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Today => "TODAY",
            Self::Tomorrow => "TOMORROW",
            Self::Yesterday => "YESTERDAY",
            Self::Time => "TIME",
            Self::TimeAmPm => "TIMEAMPM",
            Self::DateBasis => "DATEBASIS",
            Self::CurrentTime => "CURRENTTIME",
            Self::Set => "SET",
            Self::Get => "GET",
            Self::ClearVars => "CLEARVARS",
            Self::IfVar => "IFVAR",
            Self::IfTrue => "IFTRUE",
            Self::IfDayOfWeek => "IFDAYOFWEEK",
            Self::IfDayOfMonth => "IFDAYOFMONTH",
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::Exit => "EXIT",
            Self::NoBlockOutput => "NOBLOCKOUTPUT",
            Self::ExitBlock => "EXITBLOCK",
            Self::Indent => "INDENT",
            Self::Unindent => "UNINDENT",
            Self::Repeat => "REPEAT",
            Self::Heading => "HEADING",
            Self::TextAlign => "TEXTALIGN",
            Self::ViewType => "VIEWTYPE",
            Self::Collapse => "COLLAPSE",
            Self::Expand => "EXPAND",
            Self::Cursor => "CURSOR",
            Self::FocusOnBlock => "FOCUSONBLOCK",
            Self::OpenPage => "OPENPAGE",
            Self::CurrentBlockRef => "CURRENTBLOCKREF",
            Self::CurrentPageName => "CURRENTPAGENAME",
            Self::BlockMentions => "BLOCKMENTIONS",
            Self::BlockMentionsDated => "BLOCKMENTIONSDATED",
            Self::Page => "PAGE",
            Self::Input => "INPUT",
            Self::Notification => "NOTIFICATION",
            Self::RandomNumber => "RANDOMNUMBER",
            Self::SmartBlock => "SMARTBLOCK",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        Self::ALL.into_iter().find(|b| b.name() == upper)
    }

    /// Arguments are handed over unexpanded
    pub fn delay_args(&self) -> bool {
        matches!(self, Self::Repeat | Self::Then | Self::Else)
    }

    /// Deprecated but still functional
    pub fn illegal(&self) -> bool {
        matches!(self, Self::CurrentTime)
    }

    pub fn arg_policy(&self) -> ArgPolicy {
        match self {
            Self::BlockMentionsDated => ArgPolicy::CoalesceDates,
            Self::Repeat => ArgPolicy::Leading(1),
            _ => ArgPolicy::Standard,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Date => "Date from natural language, optionally formatted",
            Self::Today => "Link to today's daily note",
            Self::Tomorrow => "Link to tomorrow's daily note",
            Self::Yesterday => "Link to yesterday's daily note",
            Self::Time => "Current time, 24 hour",
            Self::TimeAmPm => "Current time, 12 hour",
            Self::DateBasis => "Change the date relative dates resolve against",
            Self::CurrentTime => "Current time; use TIME",
            Self::Set => "Set a variable",
            Self::Get => "Read a variable",
            Self::ClearVars => "Forget every variable",
            Self::IfVar => "Drop the block unless a variable matches",
            Self::IfTrue => "Drop the block unless an expression is true",
            Self::IfDayOfWeek => "Drop the block unless today is one of the given weekdays",
            Self::IfDayOfMonth => "Drop the block unless today is one of the given days",
            Self::If => "Evaluate an expression for THEN and ELSE",
            Self::Then => "Content used when the last IF was true",
            Self::Else => "Content used when the last IF was false",
            Self::Exit => "Stop the workflow after this block",
            Self::NoBlockOutput => "Drop this block",
            Self::ExitBlock => "Drop this block, or drop it when empty or childless",
            Self::Indent => "Nest this block under the previous one",
            Self::Unindent => "Move this block out one level",
            Self::Repeat => "Repeat content as separate blocks",
            Self::Heading => "Set the heading level",
            Self::TextAlign => "Set the text alignment",
            Self::ViewType => "Set how children render",
            Self::Collapse => "Collapse this block",
            Self::Expand => "Expand this block",
            Self::Cursor => "Leave the cursor here after the run",
            Self::FocusOnBlock => "Focus this block after the run",
            Self::OpenPage => "Open a page or block after the run",
            Self::CurrentBlockRef => "Reference to the block being generated",
            Self::CurrentPageName => "Title of the page the run targets",
            Self::BlockMentions => "Blocks that mention a page",
            Self::BlockMentionsDated => "Blocks that mention a page on daily notes in a date range",
            Self::Page => "Link to a page, creating it if needed",
            Self::Input => "Ask the user for a value",
            Self::Notification => "Show a message",
            Self::RandomNumber => "Random integer in a range",
            Self::SmartBlock => "Run another workflow here or on a page",
        }
    }

    /// Registry entry for this built-in
    pub fn command(self) -> Command {
        let mut command = Command::new(self.name(), self)
            .with_args(self.arg_policy())
            .with_description(self.description());
        if self.delay_args() {
            command = command.delay_args();
        }
        if self.illegal() {
            command = command.illegal();
        }
        command
    }
}

#[async_trait]
impl CommandHandler for Builtin {
    async fn call(
        &self,
        interp: &mut Interpreter,
        args: Vec<String>,
    ) -> Result<CommandOutput, CommandError> {
        match self {
            Self::Date => dates::date(interp, &args),
            Self::Today => dates::offset_link(interp, 0),
            Self::Tomorrow => dates::offset_link(interp, 1),
            Self::Yesterday => dates::offset_link(interp, -1),
            Self::Time | Self::CurrentTime => Ok(dates::time(false)),
            Self::TimeAmPm => Ok(dates::time(true)),
            Self::DateBasis => dates::date_basis(interp, &args),
            Self::Set => variables::set(interp, &args),
            Self::Get => variables::get(interp, &args),
            Self::ClearVars => variables::clear(interp),
            Self::IfVar => logic::if_var(interp, &args),
            Self::IfTrue => logic::if_true(interp, &args),
            Self::IfDayOfWeek => logic::if_day_of_week(interp, &args),
            Self::IfDayOfMonth => logic::if_day_of_month(interp, &args),
            Self::If => logic::if_expr(interp, &args),
            Self::Then => logic::branch(interp, &args, true).await,
            Self::Else => logic::branch(interp, &args, false).await,
            Self::Exit => layout::exit(interp),
            Self::NoBlockOutput => layout::no_block_output(interp),
            Self::ExitBlock => layout::exit_block(interp, &args),
            Self::Indent => layout::indent(interp, true),
            Self::Unindent => layout::indent(interp, false),
            Self::Repeat => layout::repeat(interp, &args).await,
            Self::Heading => layout::heading(interp, &args),
            Self::TextAlign => layout::text_align(interp, &args),
            Self::ViewType => layout::view_type(interp, &args),
            Self::Collapse => layout::set_open(interp, false),
            Self::Expand => layout::set_open(interp, true),
            Self::Cursor => interaction::cursor(interp),
            Self::FocusOnBlock => interaction::focus_on_block(interp),
            Self::OpenPage => interaction::open_page(interp, &args),
            Self::CurrentBlockRef => Ok(format!("(({}))", interp.ctx.current_uid).into()),
            Self::CurrentPageName => queries::current_page_name(interp).await,
            Self::BlockMentions => queries::block_mentions(interp, &args).await,
            Self::BlockMentionsDated => queries::block_mentions_dated(interp, &args).await,
            Self::Page => queries::page(interp, &args).await,
            Self::Input => interaction::input(interp, &args).await,
            Self::Notification => interaction::notification(interp, &args),
            Self::RandomNumber => interaction::random_number(&args),
            Self::SmartBlock => {
                let name = arg(&args, 0).trim();
                if name.is_empty() {
                    return Err(CommandError::invalid("SMARTBLOCK needs a workflow name"));
                }
                let page = args.get(1).map(|p| p.trim()).filter(|p| !p.is_empty());
                interp.run_nested(name, page).await
            }
        }
    }
}
