#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use cmd::{detect_encoding, learn_barcodes, qc};
use human_panic::setup_panic;
use lazy_static::lazy_static;

use crate::logging::init_logging;
use crate::opts::OutputWriter;
use crate::progress_bar::ReadDbProgressBar;

mod cli;
mod cmd;
mod logging;
mod opts;
mod progress_bar;

lazy_static! {
    pub(crate) static ref PROGRESS_BAR: ReadDbProgressBar = ReadDbProgressBar::new();
}

fn main() -> anyhow::Result<()> {
    setup_panic!();

    let cli: Cli = Cli::parse();

    if !cli.no_progress {
        PROGRESS_BAR.show();
    }

    init_logging(cli.verbose.log_level_filter()).context("Could not initialize logging")?;

    match &cli.command {
        Commands::Qc {
            input,
            output,
            format,
            options,
            config,
            summary,
        } => {
            let config = qc::load_config(config.as_deref(), options)?;
            let reader = input.as_reader()?;
            PROGRESS_BAR.set_total_bytes(reader.length()?.unwrap_or(0));
            let reader = reader
                .into_buf_read()
                .with_context(|| format!("Could not open {}", input))?;
            let output = OutputWriter::from_path(output)?;

            qc::qc(
                reader,
                output.into_write(),
                format.into(),
                config,
                summary.clone(),
                Arc::new(PROGRESS_BAR.clone()),
            )
            .context("Failed to run quality control on given file")?;
        }
        Commands::DetectEncoding { input, sample } => {
            let reader = input
                .as_reader()?
                .into_buf_read()
                .with_context(|| format!("Could not open {}", input))?;

            detect_encoding::detect_encoding(reader, io::stdout(), *sample)?;
        }
        Commands::LearnBarcodes {
            input,
            output,
            sample,
            roche_mid_len,
        } => {
            let reader = input
                .as_reader()?
                .into_buf_read()
                .with_context(|| format!("Could not open {}", input))?;
            let output = OutputWriter::from_path(output)?;

            learn_barcodes::learn_barcodes(reader, output.into_write(), *sample, *roche_mid_len)
                .context("Failed to learn barcodes of given file")?;
        }
    }

    PROGRESS_BAR.finish();
    Ok(())
}
