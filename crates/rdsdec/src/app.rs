//! Reports decoder events
//!
//! The [`Reporter`] listens to the decoder. For every change,
//! it prints one line:
//!
//! ```txt
//! PI C204
//! ECC E1
//! PS "CAPITAL "
//! RT "Now playing"
//! RESET
//! ```
//!
//! If a child process was requested, it is spawned for each
//! change and run to completion before decoding continues.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use log::{debug, error, info, warn};
use rdsdecoder::{DecoderEvent, DecoderState, FieldUpdate, Listener, ListenerResult, RdsDecoder};

use crate::cli::Args;
use crate::spawner;

/// Run the application
///
/// Reports every change from the `decoder` until its source
/// is exhausted. Reaching the end of the input is not an
/// error.
pub fn run(args: &Args, decoder: &RdsDecoder) -> Result<(), anyhow::Error> {
    let reporter = Reporter::new(Config {
        child_args: args.child.clone(),
        quiet: args.quiet,
    });
    decoder.add_listener(Arc::new(reporter));

    decoder.start().context("unable to start RDS decoder")?;
    match decoder.join() {
        Ok(()) => Ok(()),
        Err(err) if err.is_end_of_stream() => {
            info!("end of input");
            Ok(())
        }
        Err(err) => Err(err).context("RDS decoding failed"),
    }
}

/// Configuration
#[derive(Clone, Debug, Default)]
struct Config {
    child_args: Vec<String>,
    quiet: bool,
}

/// Prints changes and runs the child process
#[derive(Debug)]
struct Reporter {
    config: Config,
}

impl Reporter {
    fn new(config: Config) -> Self {
        Self { config }
    }

    fn report(&self, state: &DecoderState, event: DecoderEvent) -> ListenerResult {
        if !self.config.quiet {
            println!("{}", event);
        }

        let (cmd, cmd_args) = match self.config.child_args.split_first() {
            Some(child) => child,
            None => {
                debug!("no child process to spawn");
                return Ok(());
            }
        };

        let mut child = match spawner::spawn(cmd, cmd_args, &event, &state.fields(), Utc::now())
        {
            Ok(child) => child,
            Err(err) => {
                error!("unable to spawn child process: {}", err);
                return Ok(());
            }
        };

        debug!("spawned child process PID {}", child.id());

        // run it to conclusion
        match child.wait() {
            Ok(exit) => {
                if exit.success() {
                    debug!("child process exited successfully");
                } else {
                    warn!(
                        "child process exited abnormally with status {}",
                        exit.code().unwrap_or(1)
                    );
                }
            }
            Err(err) => {
                error!("unable to await child process exit: {}", err);
            }
        }

        Ok(())
    }
}

impl Listener for Reporter {
    fn on_identity_change(&self, state: &DecoderState, pi: u16) -> ListenerResult {
        self.report(state, DecoderEvent::Changed(FieldUpdate::Identity(pi)))
    }

    fn on_country_change(&self, state: &DecoderState, ecc: u8) -> ListenerResult {
        self.report(state, DecoderEvent::Changed(FieldUpdate::Country(ecc)))
    }

    fn on_name_change(&self, state: &DecoderState, ps: &str) -> ListenerResult {
        self.report(state, DecoderEvent::Changed(FieldUpdate::Name(ps.to_owned())))
    }

    fn on_text_change(&self, state: &DecoderState, rt: &str) -> ListenerResult {
        self.report(state, DecoderEvent::Changed(FieldUpdate::Text(rt.to_owned())))
    }

    fn on_reset(&self, state: &DecoderState) -> ListenerResult {
        info!("decoder reset");
        self.report(state, DecoderEvent::Reset)
    }
}
