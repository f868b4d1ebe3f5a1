use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[clap(name = "assdump")]
#[clap(about = "assdump extracts ARIB closed captions from a transport stream into an ASS script.", long_about = None)]
#[clap(author = "maleicacid")]
#[clap(version)]
pub(crate) struct Cli {
    /// The transport stream to read.{n}
    /// Packets must be 188 bytes long and aligned to the start of the file.
    #[clap(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the ASS script.{n}
    /// Standard output is used when omitted.
    #[clap(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[clap(short = 'f', long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v: info, -vv: debug).{n}
    /// RUST_LOG takes precedence when set.
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Show a progress bar on stderr.
    #[clap(long)]
    pub progress: bool,

    /// Emit the last caption at end of stream instead of dropping it.
    #[clap(long)]
    pub flush_at_eof: bool,
}

impl Cli {
    /// Log level requested on the command line, if any.
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        match self.verbose {
            0 => None,
            1 => Some(log::LevelFilter::Info),
            _ => Some(log::LevelFilter::Debug),
        }
    }
}
