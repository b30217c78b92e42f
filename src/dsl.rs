//! View-spec parser and executor.
//!
//! A view spec stores filters, sort and paging as text, one command per
//! line:
//! ```text
//! # swords, best first
//! FILTER t = "sword"
//! SORT q DESC NUMERIC
//! PAGE 2
//! SIZE 50
//! ```
//!
//! - Keywords are case-insensitive.
//! - Values use the first non-blank character as delimiter: `"sword"`,
//!   `/sword/` and `.sword.` are the same value.
//! - Lines starting with `#` are comments; blank lines are ignored.
//! - Later commands override earlier ones for the same field or setting.
//!
//! Supported commands:
//! - `FILTER field = "value"` - keep records whose field equals value
//! - `FILTER field = ""` or `UNFILTER field` - drop the filter on field
//! - `SORT field [ASC|DESC] [TEXT|NUMERIC]` - sort key, direction, comparison
//! - `UNSORT` - keep input order
//! - `PAGE n` - 1-based page to show
//! - `SIZE n` - records per page
//! - `PAGE n,size` - both at once
//!
//! `PAGE` and `SIZE` take the same lenient numbers as UI input: anything
//! that is not a leading integer falls back to the default.

use crate::csv::encode_records;
use crate::error::ViewError;
use crate::record::Dataset;
use crate::view::{
    Coercion, DEFAULT_PAGE_SIZE, SortDirection, ViewResult, ViewState, parse_int_prefix,
};

/// Parsed view-spec command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// FILTER field = "value"
    Filter { field: String, value: String },
    /// UNFILTER field
    Unfilter { field: String },
    /// SORT field [ASC|DESC] [TEXT|NUMERIC]
    Sort {
        field: String,
        direction: SortDirection,
        coercion: Coercion,
    },
    /// UNSORT
    Unsort,
    /// PAGE n (`None` when n is not a number)
    Page { page: Option<i64> },
    /// SIZE n (`None` when n is not a number)
    Size { size: Option<i64> },
}

impl Command {
    /// Get the command name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Filter { .. } => "FILTER",
            Command::Unfilter { .. } => "UNFILTER",
            Command::Sort { .. } => "SORT",
            Command::Unsort => "UNSORT",
            Command::Page { .. } => "PAGE",
            Command::Size { .. } => "SIZE",
        }
    }
}

fn spec_error(line: usize, message: impl Into<String>) -> ViewError {
    ViewError::Spec {
        line,
        message: message.into(),
    }
}

/// Parse view-spec text into commands.
pub fn parse_commands(text: &str) -> Result<Vec<Command>, ViewError> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = parse_command(line).map_err(|e| spec_error(line_num + 1, e))?;
        commands.extend(parsed);
    }

    Ok(commands)
}

/// Split a line into its keyword and the rest.
fn split_keyword(line: &str) -> (String, &str) {
    match line.find(char::is_whitespace) {
        Some(idx) => (line[..idx].to_uppercase(), line[idx..].trim()),
        None => (line.to_uppercase(), ""),
    }
}

/// Parse a single command line.
///
/// `PAGE n,size` expands to two commands.
fn parse_command(line: &str) -> Result<Vec<Command>, String> {
    let (keyword, rest) = split_keyword(line);

    match keyword.as_str() {
        "FILTER" => parse_filter(rest).map(|c| vec![c]),
        "UNFILTER" => parse_unfilter(rest).map(|c| vec![c]),
        "SORT" => parse_sort(rest).map(|c| vec![c]),
        "UNSORT" => Ok(vec![Command::Unsort]),
        "PAGE" => parse_page(rest),
        "SIZE" => parse_size(rest).map(|c| vec![c]),
        _ => Err(format!("Unknown command: {keyword}")),
    }
}

/// Parse a delimited string.
/// The first non-blank character is the delimiter, and the string
/// continues until the next occurrence of that delimiter.
/// Returns (extracted_string, rest_of_input).
fn parse_delimited_string(s: &str) -> Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(delim) = s.chars().next() else {
        return Err("Expected delimited string".to_string());
    };
    let after_delim = &s[delim.len_utf8()..];

    // Find the closing delimiter
    if let Some(end) = after_delim.find(delim) {
        let extracted = after_delim[..end].to_string();
        let rest = &after_delim[end + delim.len_utf8()..];
        Ok((extracted, rest))
    } else {
        Err(format!("Unclosed delimiter '{delim}'"))
    }
}

/// Parse FILTER: `field = <delimited value>`.
fn parse_filter(rest: &str) -> Result<Command, String> {
    let Some(idx) = rest.find('=') else {
        return Err("FILTER requires field = \"value\"".to_string());
    };

    let field = rest[..idx].trim();
    if field.is_empty() {
        return Err("FILTER requires a field name".to_string());
    }

    let (value, trailing) = parse_delimited_string(&rest[idx + 1..])?;
    if !trailing.trim().is_empty() {
        return Err(format!("Unexpected text after FILTER value: {}", trailing.trim()));
    }

    Ok(Command::Filter {
        field: field.to_string(),
        value,
    })
}

fn parse_unfilter(rest: &str) -> Result<Command, String> {
    if rest.is_empty() {
        return Err("UNFILTER requires a field name".to_string());
    }
    Ok(Command::Unfilter {
        field: rest.to_string(),
    })
}

/// Parse SORT: `field [ASC|DESC] [TEXT|NUMERIC]`, options in any order.
fn parse_sort(rest: &str) -> Result<Command, String> {
    let mut words = rest.split_whitespace();
    let Some(field) = words.next() else {
        return Err("SORT requires a field name".to_string());
    };

    let mut direction = SortDirection::Ascending;
    let mut coercion = Coercion::Text;
    for word in words {
        match word.to_uppercase().as_str() {
            "ASC" => direction = SortDirection::Ascending,
            "DESC" => direction = SortDirection::Descending,
            "TEXT" => coercion = Coercion::Text,
            "NUMERIC" => coercion = Coercion::Numeric,
            _ => return Err(format!("Unknown SORT option: {word}")),
        }
    }

    Ok(Command::Sort {
        field: field.to_string(),
        direction,
        coercion,
    })
}

/// Parse PAGE: `n` or `n,size`.
fn parse_page(rest: &str) -> Result<Vec<Command>, String> {
    if rest.is_empty() {
        return Err("PAGE requires a number".to_string());
    }
    match rest.split_once(',') {
        Some((page, size)) => Ok(vec![
            Command::Page {
                page: parse_int_prefix(page),
            },
            Command::Size {
                size: parse_int_prefix(size),
            },
        ]),
        None => Ok(vec![Command::Page {
            page: parse_int_prefix(rest),
        }]),
    }
}

fn parse_size(rest: &str) -> Result<Command, String> {
    if rest.is_empty() {
        return Err("SIZE requires a number".to_string());
    }
    Ok(Command::Size {
        size: parse_int_prefix(rest),
    })
}

fn to_page_number(n: Option<i64>, default: usize) -> usize {
    match n {
        Some(n) => usize::try_from(n.max(1)).unwrap_or(usize::MAX),
        None => default.max(1),
    }
}

/// Apply a single command to view state.
pub fn apply_command(state: &mut ViewState, cmd: &Command, default_size: usize) {
    match cmd {
        Command::Filter { field, value } => state.filters.set(field.as_str(), value.as_str()),
        Command::Unfilter { field } => state.filters.clear(field.as_str()),
        Command::Sort {
            field,
            direction,
            coercion,
        } => {
            state.sort.key = Some(field.clone());
            state.sort.direction = *direction;
            state.sort.coercion = *coercion;
        }
        Command::Unsort => state.sort.key = None,
        Command::Page { page } => state.page.page = to_page_number(*page, 1),
        Command::Size { size } => state.page.page_size = to_page_number(*size, default_size),
    }
}

/// Build view state from commands, starting from page 1 of `default_size`.
pub fn build_state(commands: &[Command], default_size: usize) -> ViewState {
    let mut state = ViewState::new();
    state.page.page_size = default_size.max(1);
    for cmd in commands {
        apply_command(&mut state, cmd, default_size);
    }
    state
}

/// Apply view-spec text to a dataset and render the page as CSV.
///
/// Returns (csv_text, view) on success.
pub fn execute_view<'a>(
    dataset: &'a Dataset,
    spec_text: &str,
) -> Result<(String, ViewResult<'a>), ViewError> {
    let commands = parse_commands(spec_text)?;
    let mut state = build_state(&commands, DEFAULT_PAGE_SIZE);
    let view = state.apply(dataset);
    let output = encode_records(dataset.columns(), view.records.iter().copied(), ',');
    Ok((output, view))
}
