use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use assdump::ts_analyzer::TS_PACKET_SIZE;
use assdump::{CaptionDumper, ConfigFile, DumpError};

mod context;

use context::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DumpError> {
    let file_config = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    init_logger(&cli, file_config.logging.level.as_deref());
    if let Some(path) = &cli.config {
        debug!("Loaded config from: {}", path.display());
    }

    let mut config = file_config.dumper;
    if cli.flush_at_eof {
        config.flush_at_eof = true;
    }

    let file = File::open(&cli.input)?;
    let progress = if cli.progress {
        let bar = ProgressBar::new(file.metadata()?.len());
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };
    let input: Box<dyn Read> = match &progress {
        Some(bar) => Box::new(bar.wrap_read(file)),
        None => Box::new(file),
    };
    let input = BufReader::with_capacity(TS_PACKET_SIZE * 1024, input);

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    info!("Reading {}", cli.input.display());
    let result = CaptionDumper::new(config, output).run(input);
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    let summary = result?;

    info!(
        "{} packets, {} captions decoded, {} dialogue lines written, {} sections skipped",
        summary.packets_processed, summary.captions_decoded, summary.dialogue_lines, summary.sections_skipped
    );
    Ok(())
}

/// RUST_LOG overrides -v, which overrides the config file. Defaults to warn.
fn init_logger(cli: &Cli, file_level: Option<&str>) {
    let level = cli
        .log_level()
        .or_else(|| file_level.and_then(|l| l.parse().ok()))
        .unwrap_or(log::LevelFilter::Warn);

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .init();
}
