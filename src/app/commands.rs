//! Inbound commands to the application service.
//!
//! Front ends either build a [`GpioCommand`] directly or parse one from
//! the console language:
//!
//! ```text
//! list
//! select <line>
//! read   [line]
//! write  [line] <high|low|1|0>
//! mode   [line] <input|pullup|pulldown|output>
//! pulse  [line] [low_ms high_ms]
//! stop
//! ```
//!
//! A line is written as `17`, `gpio17` or `GPIO17`.  An omitted line
//! means the session selection.

use core::fmt;

use crate::types::{DriveMode, Level, LogicalLine};

/// Commands that front ends send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioCommand {
    /// Summarise every mapped header slot.
    List,

    /// Make `line` the session's current line.
    Select(LogicalLine),

    Read { line: Option<LogicalLine> },

    Write { line: Option<LogicalLine>, level: Level },

    SetMode { line: Option<LogicalLine>, mode: DriveMode },

    /// Start the square wave.  `None` intervals use the configured defaults;
    /// raw values are validated by the service.
    Pulse {
        line: Option<LogicalLine>,
        intervals: Option<(i64, i64)>,
    },

    StopPulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownVerb,
    /// A required argument is missing; carries its name.
    MissingArgument(&'static str),
    BadLine,
    BadLevel,
    BadMode,
    BadInterval,
    TooManyArguments,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownVerb => write!(f, "unknown command"),
            Self::MissingArgument(name) => write!(f, "missing {name}"),
            Self::BadLine => write!(f, "expected a line number such as 17 or gpio17"),
            Self::BadLevel => write!(f, "expected high, low, 1 or 0"),
            Self::BadMode => write!(f, "expected input, pullup, pulldown or output"),
            Self::BadInterval => write!(f, "expected two integer intervals in milliseconds"),
            Self::TooManyArguments => write!(f, "too many arguments"),
        }
    }
}

impl std::error::Error for ParseError {}

impl GpioCommand {
    /// Parse one line of console input.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut words = input.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?;
        let args: heapless::Vec<&str, 3> = words
            .try_fold(heapless::Vec::new(), |mut acc, w| {
                acc.push(w).map(|()| acc)
            })
            .map_err(|_| ParseError::TooManyArguments)?;

        match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("list" | "ls", []) => Ok(Self::List),
            ("select" | "sel", [line]) => Ok(Self::Select(parse_line(line)?)),
            ("select" | "sel", []) => Err(ParseError::MissingArgument("line")),

            ("read", []) => Ok(Self::Read { line: None }),
            ("read", [line]) => Ok(Self::Read {
                line: Some(parse_line(line)?),
            }),

            ("write", [level]) => Ok(Self::Write {
                line: None,
                level: parse_level(level)?,
            }),
            ("write", [line, level]) => Ok(Self::Write {
                line: Some(parse_line(line)?),
                level: parse_level(level)?,
            }),
            ("write", []) => Err(ParseError::MissingArgument("level")),

            ("mode", [mode]) => Ok(Self::SetMode {
                line: None,
                mode: parse_mode(mode)?,
            }),
            ("mode", [line, mode]) => Ok(Self::SetMode {
                line: Some(parse_line(line)?),
                mode: parse_mode(mode)?,
            }),
            ("mode", []) => Err(ParseError::MissingArgument("mode")),

            ("pulse", []) => Ok(Self::Pulse {
                line: None,
                intervals: None,
            }),
            ("pulse", [line]) => Ok(Self::Pulse {
                line: Some(parse_line(line)?),
                intervals: None,
            }),
            ("pulse", [low, high]) => Ok(Self::Pulse {
                line: None,
                intervals: Some(parse_intervals(low, high)?),
            }),
            ("pulse", [line, low, high]) => Ok(Self::Pulse {
                line: Some(parse_line(line)?),
                intervals: Some(parse_intervals(low, high)?),
            }),

            ("stop", []) => Ok(Self::StopPulse),

            ("list" | "ls" | "select" | "sel" | "read" | "write" | "mode" | "stop", _) => {
                Err(ParseError::TooManyArguments)
            }
            _ => Err(ParseError::UnknownVerb),
        }
    }
}

fn parse_line(word: &str) -> Result<LogicalLine, ParseError> {
    let digits = word
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("gpio"))
        .map_or(word, |_| &word[4..]);
    digits.parse::<u8>().map(LogicalLine).map_err(|_| ParseError::BadLine)
}

fn parse_level(word: &str) -> Result<Level, ParseError> {
    match word.to_ascii_lowercase().as_str() {
        "high" | "1" | "on" => Ok(Level::High),
        "low" | "0" | "off" => Ok(Level::Low),
        _ => Err(ParseError::BadLevel),
    }
}

fn parse_mode(word: &str) -> Result<DriveMode, ParseError> {
    match word.to_ascii_lowercase().as_str() {
        "input" | "in" => Ok(DriveMode::Input),
        "pullup" | "up" => Ok(DriveMode::InputPullUp),
        "pulldown" | "down" => Ok(DriveMode::InputPullDown),
        "output" | "out" => Ok(DriveMode::Output),
        _ => Err(ParseError::BadMode),
    }
}

fn parse_intervals(low: &str, high: &str) -> Result<(i64, i64), ParseError> {
    match (low.parse::<i64>(), high.parse::<i64>()) {
        (Ok(low), Ok(high)) => Ok((low, high)),
        _ => Err(ParseError::BadInterval),
    }
}
