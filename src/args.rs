use std::path::PathBuf;

use clap::Parser;

/// Scrape GitHub search results and repository language statistics.
///
/// The input file is a JSON object such as
/// `{"keywords": ["python", "jwt"], "proxies": [], "type": "repositories"}`.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// A path to the file with input data (JSON).
    pub input_file_path: PathBuf,

    /// A path to the file for the parsed data (JSON). Printed to stdout when omitted.
    pub output_file_path: Option<PathBuf>,

    /// Do not draw a progress bar while repository pages are fetched.
    #[clap(long)]
    pub no_progress: bool,
}
