mod cli;

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use cli::{Cli, Commands, FetchArgs};
use fetchpool::config::Config;
use fetchpool::fetch::{Fetcher, GetOptions};
use fetchpool::{observability, sanitize};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    observability::init("info");

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Fetch(args) => fetch(config, args).await?,
    }

    Ok(())
}

async fn fetch(config: Config, args: FetchArgs) -> Result<(), AnyError> {
    let mut opts = GetOptions {
        retry_limit: args.retries,
        ..GetOptions::default()
    };
    if args.insecure {
        opts.verify_tls = Some(false);
    }
    if args.all_errors {
        opts.return_all_error = Some(true);
    }
    if let Some(proxy) = args.proxy {
        opts.proxies = Some(BTreeMap::from([
            ("http".to_string(), proxy.clone()),
            ("https".to_string(), proxy),
        ]));
    }
    if !args.headers.is_empty() {
        let mut headers = BTreeMap::new();
        for raw in &args.headers {
            let (name, value) = raw
                .split_once(':')
                .ok_or_else(|| format!("malformed header '{raw}', expected 'Name: value'"))?;
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }
        opts.additional_headers = Some(headers);
    }

    let fetcher = Fetcher::new(config.fetch);
    let response = fetcher.get(&args.url, opts).await?;

    let output = args.output.unwrap_or_else(|| default_output(&args.url));
    std::fs::write(&output, &response.body)?;
    info!(
        url = %args.url,
        status = response.status,
        bytes = response.body.len(),
        output = %output.display(),
        "fetch complete"
    );

    Ok(())
}

/// Derive an output file name from the URL tail.
fn default_output(url: &str) -> PathBuf {
    let tail = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let name = sanitize::file_name(tail, "_");
    if name.is_empty() {
        PathBuf::from("download.out")
    } else {
        PathBuf::from(name)
    }
}
