//! Spawns child process for a decoder event

use std::ffi::OsStr;
use std::io;
use std::process::{Child, Command, Stdio};

use chrono::{DateTime, Utc};
use rdsdecoder::{format_country, format_identity, DecodedFields, DecoderEvent};

/// Spawn a child process to handle the given event
///
/// The child process will receive information about the
/// change, and about every other known field, via the
/// environment. Its standard input is closed.
///
/// This method will attempt to start an executable named
/// `cmd` with the given `args`. The `event`, the current
/// `fields`, and the current time `now` are transformed into
/// environment variables.
pub fn spawn<C, A, B>(
    cmd: C,
    args: A,
    event: &DecoderEvent,
    fields: &DecodedFields,
    now: DateTime<Utc>,
) -> io::Result<Child>
where
    C: AsRef<OsStr>,
    B: AsRef<OsStr>,
    A: IntoIterator<Item = B>,
{
    Command::new(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .args(args)
        .envs(child_env(event, fields, now))
        .spawn()
}

// environment for the child process
fn child_env(
    event: &DecoderEvent,
    fields: &DecodedFields,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let (field, value) = match event {
        DecoderEvent::Changed(update) => (update.field().to_string(), update.value_string()),
        DecoderEvent::Reset => ("reset".to_owned(), String::new()),
    };

    vec![
        (childenv::RDSDEC_FIELD, field),
        (childenv::RDSDEC_VALUE, value),
        (
            childenv::RDSDEC_PI,
            fields.identity.map(format_identity).unwrap_or_default(),
        ),
        (
            childenv::RDSDEC_ECC,
            fields.country.map(format_country).unwrap_or_default(),
        ),
        (
            childenv::RDSDEC_PS,
            fields.service_name.clone().unwrap_or_default(),
        ),
        (childenv::RDSDEC_RT, fields.text.clone().unwrap_or_default()),
        (childenv::RDSDEC_TIME, time_to_unix_str(now)),
    ]
}

mod childenv {
    /// Which field changed
    ///
    /// One of `pi`, `ecc`, `ps`, or `rt`. Set to `reset` when the
    /// decoder has been reset and every field is unknown.
    pub const RDSDEC_FIELD: &str = "RDSDEC_FIELD";

    /// The new value of the changed field
    ///
    /// Formatted like the corresponding `RDSDEC_PI`, `RDSDEC_ECC`,
    /// `RDSDEC_PS`, or `RDSDEC_RT` variable. Empty on reset.
    pub const RDSDEC_VALUE: &str = "RDSDEC_VALUE";

    /// Programme identification code
    ///
    /// Four uppercase hex digits, like `C204`. Empty if unknown.
    pub const RDSDEC_PI: &str = "RDSDEC_PI";

    /// Extended country code
    ///
    /// Two uppercase hex digits, like `E1`. Empty if unknown.
    pub const RDSDEC_ECC: &str = "RDSDEC_ECC";

    /// Programme service name
    ///
    /// Always eight characters, including any trailing spaces
    /// the station sends. Empty if unknown.
    pub const RDSDEC_PS: &str = "RDSDEC_PS";

    /// RadioText
    ///
    /// Up to 64 characters. Empty if unknown.
    pub const RDSDEC_RT: &str = "RDSDEC_RT";

    /// Time of the change (UTC UNIX timestamp, in seconds)
    ///
    /// Taken from the current OS realtime clock.
    pub const RDSDEC_TIME: &str = "RDSDEC_TIME";
}

// convert DateTime to UTC unix timestamp in seconds, as string
fn time_to_unix_str(tm: DateTime<Utc>) -> String {
    format!("{}", tm.format("%s"))
}
