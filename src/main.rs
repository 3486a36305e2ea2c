// Command-line entry point: crawl a site and optionally persist pages
// and export a CSV summary.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use sitecrawl::config::CrawlConfigBuilder;
use sitecrawl::crawl_engine::{Crawler, LogProgress};
use sitecrawl::export::export_csv;

const USAGE: &str = "usage: sitecrawl <start-url> [--out DIR] [--pages N] [--depth N] [--csv FILE]";

struct CliArgs {
    start_url: String,
    out_dir: Option<PathBuf>,
    max_pages: Option<usize>,
    max_depth: Option<u32>,
    csv_path: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut start_url = None;
    let mut out_dir = None;
    let mut max_pages = None;
    let mut max_depth = None;
    let mut csv_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                out_dir = Some(PathBuf::from(
                    args.next().context("--out requires a directory")?,
                ));
            }
            "--pages" => {
                max_pages = Some(
                    args.next()
                        .context("--pages requires a number")?
                        .parse()
                        .context("--pages must be a positive integer")?,
                );
            }
            "--depth" => {
                max_depth = Some(
                    args.next()
                        .context("--depth requires a number")?
                        .parse()
                        .context("--depth must be a positive integer")?,
                );
            }
            "--csv" => {
                csv_path = Some(PathBuf::from(
                    args.next().context("--csv requires a file path")?,
                ));
            }
            other if other.starts_with("--") => bail!("unknown option {other}\n{USAGE}"),
            other if start_url.is_none() => start_url = Some(other.to_string()),
            other => bail!("unexpected argument {other}\n{USAGE}"),
        }
    }

    Ok(CliArgs {
        start_url: start_url.with_context(|| USAGE.to_string())?,
        out_dir,
        max_pages,
        max_depth,
        csv_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = parse_args(std::env::args().skip(1))?;

    let mut builder = CrawlConfigBuilder::new().start_url(&cli.start_url);
    if let Some(dir) = cli.out_dir {
        builder = builder.storage_dir(dir);
    }
    if let Some(pages) = cli.max_pages {
        builder = builder.max_pages(pages);
    }
    if let Some(depth) = cli.max_depth {
        builder = builder.max_depth(depth);
    }
    let config = builder.build()?;

    let crawler = Crawler::new(config)?.with_progress(Arc::new(LogProgress));
    let cancel = CancellationToken::new();

    let results = crawler.crawl(&cancel).await?;

    println!("{:<6} {:>8}  url", "status", "ms");
    for record in &results {
        let status = record
            .envelope
            .status
            .map(|s| s.as_u16().to_string())
            .unwrap_or_else(|| "-".to_string());
        let elapsed_ms = record
            .envelope
            .elapsed
            .map(|d| d.as_millis())
            .unwrap_or_default();
        println!("{:<6} {:>8}  {}", status, elapsed_ms, record.url());
    }
    println!("crawled {} pages", results.len());

    if let Some(path) = cli.csv_path {
        export_csv(&results, &path).await?;
        println!("results written to {}", path.display());
    }

    Ok(())
}
