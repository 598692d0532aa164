use crate::{GridFilterError, GridFilterResult};

use clap::Parser;
use std::path::PathBuf;

/// Default delimiter used for CSV parsing if not specified.
pub static DEFAULT_CSV_DELIMITER: &str = ",";

/// Default dataset scope for session snapshots when none is given.
pub static DEFAULT_SCOPE: &str = "default";

// https://stackoverflow.com/questions/74068168/clap-rs-not-printing-colors-during-help
fn get_styles() -> clap::builder::Styles {
    let cyan = anstyle::Color::Ansi(anstyle::AnsiColor::Cyan);
    let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
    let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);

    clap::builder::Styles::styled()
        .placeholder(anstyle::Style::new().fg_color(Some(yellow)))
        .usage(anstyle::Style::new().fg_color(Some(cyan)).bold())
        .header(
            anstyle::Style::new()
                .fg_color(Some(cyan))
                .bold()
                .underline(),
        )
        .literal(anstyle::Style::new().fg_color(Some(green)))
}

// https://docs.rs/clap/latest/clap/struct.Command.html#method.help_template
const APPLET_TEMPLATE: &str = "\
{before-help}
{about-with-newline}
{usage-heading} {usage}

{all-args}
{after-help}";

const EX1: &str = r#" gridfilter data.csv"#;
const EX2: &str = r#" gridfilter data.csv -d ";" -s sales"#;
const EX3: &str = r#" gridfilter data.csv --state-file ~/.local/share/gridfilter/state.json"#;

/// Command-line arguments for the grid filter viewer.
#[derive(Parser, Debug, Clone)]
#[command(
    // Read from `Cargo.toml`.
    author, version, about,
    long_about = None,
    next_line_help = true,
    help_template = APPLET_TEMPLATE,
    styles = get_styles(),
    after_help = format!("EXAMPLES:\n{EX1}\n{EX2}\n{EX3}")
)]
pub struct Arguments {
    /// Path to the CSV data file.
    #[arg(
        value_name = "FILE_PATH",
        help = "Path to the CSV data file",
        long_help = "Path to the input CSV file.\n\
        The header row provides the column names; empty cells are nulls."
    )]
    pub path: PathBuf,

    /// CSV delimiter character. [Default: ',']
    #[arg(
        short = 'd',
        long,
        default_value = DEFAULT_CSV_DELIMITER,
        help = "CSV delimiter character",
        long_help = "Sets the CSV delimiter. Must be a single ASCII character.",
        value_parser = validate_delimiter_argument
    )]
    pub delimiter: String,

    /// Dataset scope used to key session snapshots. [Default: 'default']
    #[arg(
        short = 's',
        long,
        value_name = "SCOPE",
        default_value = DEFAULT_SCOPE,
        help = "Dataset scope for session snapshots",
        long_help = "Session snapshots are keyed by scope: filters saved for one\n\
        dataset are never restored onto another. Use a stable identifier\n\
        per dataset (e.g., the file stem)."
    )]
    pub scope: String,

    /// Optional JSON file used to persist presets and session snapshots.
    #[arg(
        long = "state-file",
        value_name = "STATE_FILE",
        help = "JSON file for persisting presets and session snapshots [Optional]",
        long_help = "Path to a JSON file backing the key-value store.\n\
        If omitted, presets and session snapshots only live for this run."
    )]
    pub state_file: Option<PathBuf>,
}

impl Arguments {
    /// Build `Arguments` struct.
    pub fn build() -> Arguments {
        Arguments::parse()
    }

    /// The delimiter as a single byte, as the CSV reader wants it.
    pub fn delimiter_byte(&self) -> u8 {
        // The value parser guarantees exactly one ASCII byte.
        self.delimiter.as_bytes()[0]
    }
}

// --- Validation Functions ---

/// clap validator for the '--delimiter' argument: one ASCII character.
fn validate_delimiter_argument(s: &str) -> GridFilterResult<String> {
    if s.len() == 1 && s.is_ascii() {
        Ok(s.to_string())
    } else {
        Err(GridFilterError::InvalidArgument {
            arg_name: "--delimiter".to_string(),
            reason: format!("must be a single ASCII character (got '{s}')"),
        })
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
