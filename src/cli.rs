use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(
        about = "Zip every subfolder of a folder and upload them one by one",
        name = "push",
        display_order = 1
    )]
    Push {
        #[clap(required = true, help = "Folder to upload")]
        folder: PathBuf,
        #[clap(short = 'e', long, help = "Upload endpoint URL (overrides config)")]
        endpoint: Option<String>,
        #[clap(long, help = "Cookie header sent with every request (overrides config)")]
        cookie: Option<String>,
        #[clap(long = "csrf-token", help = "Anti-forgery token, used when the cookie has none")]
        csrf_token: Option<String>,
        #[clap(long = "form", help = "Saved upload page HTML; supplies form action and hidden token")]
        form_html: Option<PathBuf>,
        #[clap(long = "include-loose", help = "Upload files directly under the folder as one extra group")]
        include_loose: bool,
        #[clap(short = 'r', long = "retries", help = "Attempts per group on network errors (default 1)")]
        retries: Option<usize>,
        #[clap(short = 'y', long = "yes", help = "Do not ask for confirmation")]
        yes: bool,
        #[clap(short, long, help = "Write debug logs to ~/.reelpack/logs/reelpack.log")]
        verbose: bool,
        #[clap(long, help = "Print one JSON summary line instead of progress output")]
        json: bool,
        #[clap(short, long, help = "Suppress progress and summary output")]
        quiet: bool,
    },
    #[clap(about = "Show how a folder would be grouped without uploading", name = "scan", display_order = 2)]
    Scan {
        #[clap(required = true, help = "Folder to inspect")]
        folder: PathBuf,
        #[clap(long = "include-loose", help = "Fold files directly under the folder into an extra group")]
        include_loose: bool,
    },
    #[clap(about = "Configure reelpack", display_order = 3)]
    Set {
        #[clap(short = 'e', long, help = "Set the upload endpoint URL", display_order = 1)]
        endpoint: Option<String>,
        #[clap(short = 'b', long = "base-url", help = "Set the base URL for relative form actions", display_order = 2)]
        base_url: Option<String>,
        #[clap(short = 'c', long, help = "Set the cookie header", display_order = 3)]
        cookie: Option<String>,
        #[clap(
            short = 'l',
            long = "level",
            value_parser = clap::value_parser!(i64).range(1..=9),
            help = "Set the deflate level (1-9)",
            display_order = 4
        )]
        level: Option<i64>,
        #[clap(short = 't', long, help = "Set the request timeout in seconds (0 = none)", display_order = 5)]
        timeout: Option<u64>,
        #[clap(short = 'r', long, help = "Set attempts per group on network errors", display_order = 6)]
        retries: Option<usize>,
    },
    #[clap(about = "Print the current configuration", name = "show", display_order = 4)]
    Show {},
}
