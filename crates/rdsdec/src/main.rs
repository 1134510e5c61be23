use std::io;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::{info, LevelFilter};

use rdsdecoder::{RdsDecoder, RdsDecoderBuilder, RecordReader};

mod app;
mod cli;
mod spawner;

use cli::{Args, CliError};

fn main() {
    match rdsdec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn rdsdec() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // create the decoder
    let mut cfg = RdsDecoderBuilder::new();
    cfg.with_text_ab_reset(!args.no_text_ab_reset)
        .with_complete_text(!args.no_complete_text);
    let decoder = decoder_setup(&args, &cfg)?;

    // processing: report changes until the input is exhausted
    app::run(&args, &decoder)?;

    if let Some(ps) = decoder.service_name() {
        info!("last service name: \"{}\"", ps);
    }

    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("rdsdecoder", log_filter)
            .filter_module("rdsdec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn decoder_setup(args: &Args, cfg: &RdsDecoderBuilder) -> Result<RdsDecoder, anyhow::Error> {
    if args.input_is_stdin() {
        info!("RDS decoder reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(cfg.build(RecordReader::new(io::BufReader::new(io::stdin()))))
        } else {
            Err(anyhow!(
                "cowardly refusing to read RDS records from a terminal.

Pipe raw RDS block records from a radio device or a capture
file into this program, or use --file."
            ))
        }
    } else {
        info!("RDS decoder reading file: \"{}\"", &args.file);
        cfg.open(&args.file)
            .with_context(|| format!("Unable to open --file \"{}\"", args.file))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
