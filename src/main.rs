// src/main.rs
// =============================================================================
// Entry point of the link-auditor CLI.
//
// What happens here:
// 1. Set up logging and parse command-line arguments
// 2. Crawl the site (or load a saved dataset)
// 3. Rebuild the link graph and classify every link
// 4. Write the reports, notify about broken links, print a summary
// 5. Exit with 0 = no broken links, 1 = broken links found, 2 = error
// =============================================================================

mod checker;
mod cli;
mod config;
mod crawl;
mod error;
mod graph;
mod notify;
mod output;
mod record;
mod report;
mod url_norm;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, CrawlArgs};
use config::CrawlConfig;
use crawl::{Checkpoint, Crawler};
use graph::{build_results, PageResult};
use notify::{notify_broken_links, HttpMailer, Mailer};
use output::OutputDir;
use report::{build_rows, ReportStyles, ReportSummary};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so that --json output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => handle_crawl(&args).await,
        Commands::Report {
            dataset,
            base_url,
            output_dir,
            broken_only,
            json,
        } => handle_report(&dataset, &base_url, &output_dir, broken_only, json).await,
    }
}

// Handles the 'crawl' subcommand: crawl, graph, reports, notification
async fn handle_crawl(args: &CrawlArgs) -> Result<i32> {
    let mut config = match &args.input {
        Some(path) => CrawlConfig::from_file(path)?,
        None => CrawlConfig::default(),
    };
    args.apply(&mut config);
    info!("Input: {:?}", config);

    // An unusable base URL stops everything before the first request
    let base_url = config.validate()?;

    let output = OutputDir::new(&config.output_dir);
    let store = crawl::initial_store(&output.checkpoint_path(), &base_url, config.resume)
        .await
        .context("Failed to prepare the crawl checkpoint")?;
    let fetcher = Arc::new(checker::HttpPageFetcher::new(
        config.navigation_timeout(),
        &config.proxy_config,
    )?);

    let crawler = Crawler::from_config(&config, fetcher, store).checkpoint(Checkpoint {
        path: output.checkpoint_path(),
        interval: config.checkpoint_interval(),
    });
    crawler.run().await;

    info!("Crawling finished, processing results...");
    // Full records drive the graph; only the persisted copy is reduced
    let records = crawler.store().snapshot();
    output
        .save_dataset(&records, config.save_only_broken_links)
        .await
        .context("Failed to save dataset")?;

    let results = build_results(&base_url, &records);
    output
        .save_results(&results, &base_url, &config.styles)
        .await
        .context("Failed to save results")?;

    let mailer = config
        .mailer_endpoint
        .as_deref()
        .map(HttpMailer::new)
        .transpose()?;
    if let Err(e) = notify_broken_links(
        &results,
        &base_url,
        &config.notification_emails,
        &config.styles,
        mailer.as_ref().map(|m| m as &dyn Mailer),
    )
    .await
    {
        // The reports are already written; a failed email does not fail the run
        error!("Failed to send email notification: {}", e);
    }

    print_results(&results, false, args.json, &config.styles)
}

// Handles the 'report' subcommand: same pipeline minus the crawl
async fn handle_report(
    dataset: &Path,
    base_url: &str,
    output_dir: &Path,
    broken_only: bool,
    json: bool,
) -> Result<i32> {
    let base_url = url_norm::normalize_page(base_url)
        .ok_or_else(|| error::ConfigError::InvalidBaseUrl(base_url.to_string()))?;

    let records = output::load_records(dataset)
        .await
        .with_context(|| format!("Failed to load records from {}", dataset.display()))?;
    if !records.is_empty() && records.iter().all(|r| r.link_urls.is_none()) {
        warn!("No record has a link list; was the dataset saved with saveOnlyBrokenLinks?");
    }

    let styles = ReportStyles::default();
    let results = build_results(&base_url, &records);
    OutputDir::new(output_dir)
        .save_results(&results, &base_url, &styles)
        .await
        .context("Failed to save results")?;

    print_results(&results, broken_only, json, &styles)
}

// Prints the results either as a table or as JSON, and picks the exit code
fn print_results(results: &[PageResult], broken_only: bool, json: bool, styles: &ReportStyles) -> Result<i32> {
    let all_rows = build_rows(results, false);
    let summary = ReportSummary::new(results, &all_rows);

    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
    } else {
        let rows = if broken_only {
            build_rows(results, true)
        } else {
            all_rows
        };
        print_table(&rows, &summary, styles);
    }

    if summary.broken > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Prints report rows as a human-readable table in the terminal
fn print_table(rows: &[report::ReportRow], summary: &ReportSummary, styles: &ReportStyles) {
    println!("{:<45} {:<45} {:<8} {:<18} DESCRIPTION", "FROM", "TO", "STATUS", "CATEGORY");
    println!("{}", "=".repeat(140));

    for row in rows {
        let status = row.http_status.map(|s| s.to_string()).unwrap_or_default();
        println!(
            "{:<45} {:<45} {:<8} {:<18} {}",
            truncate(&row.from, 44),
            truncate(&row.to, 44),
            status,
            styles.style(row.category).label,
            row.description
        );
    }

    println!();
    println!("Summary:");
    println!("   Pages:            {}", summary.pages);
    println!("   OK:               {}", summary.ok);
    println!("   Broken:           {}", summary.broken);
    println!("   Invalid fragment: {}", summary.invalid_fragment);
    println!("   Not crawled:      {}", summary.not_crawled);
    println!("   Total links:      {}", summary.total());
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
