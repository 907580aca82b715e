use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fetchpool")]
#[command(about = "Retrying downloader with a fixed worker pool", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL with retries and write the body to disk
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// URL to fetch
    pub url: String,

    /// Output file (defaults to the sanitized URL tail)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Override the configured retry limit
    #[arg(long)]
    pub retries: Option<u32>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Proxy URL, applied to both http and https
    #[arg(long)]
    pub proxy: Option<String>,

    /// Additional header as 'Name: value' (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Report every failed attempt instead of only the last one
    #[arg(long)]
    pub all_errors: bool,
}
