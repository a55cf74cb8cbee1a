use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pdf_ingestion::{
    configuration::get_configuration,
    domain::{
        entities::{
            source::{Source, SourceReport},
            vector_point::SearchHit,
        },
        services::{
            source_processor::{SOURCE_FIELD, SUMMARY_FIELD},
            vector_store::DEFAULT_SEARCH_LIMIT,
        },
    },
    helper::error_chain,
    startup::Application,
    telemetry::{get_tracing_subscriber, init_tracing_subscriber},
};

const SEPARATOR: &str = "-----------------------------------";

/// Summarizes PDF documents and stores their summaries in Qdrant
#[derive(Parser)]
#[command(name = "pdf_ingestion", version, long_about = None)]
struct Cli {
    /// Comma separated list of local PDF files
    #[arg(short, long)]
    files: Option<String>,
    /// Comma separated list of PDF URLs
    #[arg(short, long)]
    urls: Option<String>,
    /// Searches the stored summaries closest to this text
    #[arg(short, long)]
    query: Option<String>,
    /// Maximum number of search results
    #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    limit: u64,
}

impl Cli {
    fn sources(&self) -> Vec<Source> {
        let mut sources = Vec::new();
        if let Some(urls) = &self.urls {
            sources.extend(Source::urls_from_list(urls));
        }
        if let Some(files) = &self.files {
            sources.extend(Source::files_from_list(files));
        }
        sources
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout only carries the report
    let tracing_subscriber =
        get_tracing_subscriber("pdf_ingestion".into(), "info".into(), std::io::stderr);
    if let Err(error) = init_tracing_subscriber(tracing_subscriber) {
        eprintln!("{:?}", error);
    }

    let sources = cli.sources();
    if sources.is_empty() && cli.query.is_none() {
        eprintln!(
            "Usage:
    Process URLs:     pdf_ingestion -u \"url1,url2,...\"
    Process files:    pdf_ingestion -f \"path1,path2,...\"
    Search summaries: pdf_ingestion -q \"question\" [-l limit]"
        );
        return ExitCode::FAILURE;
    }

    match run(cli, sources).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Processing failed: {:?}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, sources: Vec<Source>) -> anyhow::Result<()> {
    let configuration = get_configuration().context("Failed to read configuration")?;
    let application = Application::build(configuration)
        .await
        .context("Failed to build application")?;

    if !sources.is_empty() {
        println!("Processing {} source(s)...", sources.len());
        for report in application.process_sources(sources).await {
            println!("{}", format_report(&report));
        }
    }

    if let Some(query) = &cli.query {
        let hits = application.search_summaries(query, cli.limit).await?;
        println!("Found {} summaries", hits.len());
        for hit in &hits {
            println!("{}", format_hit(hit));
        }
    }

    Ok(())
}

fn format_report(report: &SourceReport) -> String {
    let outcome = match &report.outcome {
        Ok(processed) => format!("Summary: {}", processed.summary),
        Err(error) => format!("Error: {}", one_line_error(error)),
    };
    format!("\n{}\nSource: {}\n{}", SEPARATOR, report.source, outcome)
}

fn format_hit(hit: &SearchHit) -> String {
    let field = |name: &str| hit.metadata.get(name).map(String::as_str).unwrap_or("");
    format!(
        "\n{}\nScore: {:.4}\nSource: {}\nSummary: {}",
        SEPARATOR,
        hit.score,
        field(SOURCE_FIELD),
        field(SUMMARY_FIELD)
    )
}

/// Messages of the error and of its causes on one line
fn one_line_error(error: &(dyn std::error::Error + 'static)) -> String {
    error_chain(error)
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
