use std::fmt::Display;

use clap::{error::ErrorKind, CommandFactory, Parser};

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program accepts raw RDS block records, three bytes per block, and reports the station's identity (PI), country code (ECC), service name (PS), and RadioText (RT) as they change.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program accepts raw RDS block records, three bytes per block, and reports the station's identity (PI), country code (ECC), service name (PS), and RadioText (RT) as they change. Each record is a little-endian 16-bit block followed by a status byte. This is the format produced by Linux radio devices which support RDS.

You can read directly from a tuned radio device

    rdsdec --file /dev/radio0

Changes are printed one per line:

    PI C204
    PS "CAPITAL "
    RT "Now playing: something good"

Arguments which follow "--" will be used to spawn a child process for every change. The child process receives the following environment variables:

  RDSDEC_FIELD="ps" (or pi, ecc, rt, reset)
  RDSDEC_VALUE="CAPITAL " (new value of RDSDEC_FIELD)
  RDSDEC_PI="C204" (empty if unknown)
  RDSDEC_ECC="E1" (empty if unknown)
  RDSDEC_PS="CAPITAL " (empty if unknown)
  RDSDEC_RT="Now playing: something good" (empty if unknown)
  RDSDEC_TIME="1616883240" (UTC UNIX timestamp)

Decoding pauses until the child process exits.
"#;

const ADVANCED: &str = "Advanced Decoder Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even field changes
    #[arg(short, long)]
    pub quiet: bool,

    /// Input file or device (or "-" for stdin)
    ///
    /// The input must be a stream of three-byte RDS block
    /// records.
    #[arg(long, default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// Keep partial RadioText when the text A/B flag changes
    #[arg(long)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub no_text_ab_reset: bool,

    /// Report RadioText only when terminated
    ///
    /// By default, a RadioText message which fills every
    /// character is reported even if the station never sends
    /// an end-of-text marker.
    #[arg(long)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub no_complete_text: bool,

    /// Spawn child process for every change. Optional.
    ///
    /// Arguments are provided VERBATIM to the child process
    /// without shell interpretation.
    #[arg(last = true)]
    pub child: Vec<String>,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}
