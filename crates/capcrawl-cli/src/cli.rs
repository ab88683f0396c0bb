//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Crawl the anime catalog and keep every closed-caption subtitle.
///
/// Captions that look like closed captions are saved right away; anything
/// else is shown to you for a yes/no decision.
#[derive(Parser, Debug)]
#[command(name = "capcrawl")]
#[command(author, version, about)]
pub struct Args {
    /// Settings file (YAML with `proxy` and `concurrency` keys) [default: capcrawl.yaml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Proxy for catalog requests, e.g. socks5://127.0.0.1:1080
    #[arg(short, long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Maximum concurrent requests (1-256)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub concurrency: Option<u16>,

    /// Ledger of already crawled captions
    #[arg(long, value_name = "PATH", default_value = "archive.json")]
    pub ledger: PathBuf,

    /// Directory accepted captions are written to
    #[arg(short, long, value_name = "DIR", default_value = "subtitles")]
    pub output: PathBuf,

    /// Directory captions awaiting review are copied to
    #[arg(long, value_name = "DIR", default_value = "check")]
    pub check_dir: PathBuf,

    /// Continue from the ledger without asking
    #[arg(long, conflicts_with = "fresh")]
    pub resume: bool,

    /// Ignore the ledger without asking
    #[arg(long)]
    pub fresh: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Resume decision given on the command line, if any
    pub fn resume_flag(&self) -> Option<bool> {
        match (self.resume, self.fresh) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
