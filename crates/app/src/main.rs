use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wiki_grep_core::{
    flatten_batch, ClientConfig, EnrichedBatch, MatchOutcome, OutputMode, Pipeline,
    PipelineConfig, RunOutput, SearchMode, DEFAULT_ENDPOINT, MAX_PAGE_LIMIT,
};

#[derive(Parser)]
#[command(name = "wiki-grep", version)]
struct Cli {
    /// Search pattern (case-insensitive, regex syntax allowed)
    #[arg(long, default_value = "Mr. Immortal")]
    word: String,

    /// Where the term must appear: `title`, anything else searches page text
    #[arg(long, default_value = "body")]
    search: String,

    /// What to print for each page
    #[arg(long, value_enum, default_value_t = ModeArg::Grep)]
    mode: ModeArg,

    /// Maximum number of pages to process (at most 50)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=MAX_PAGE_LIMIT as i64))]
    limit: u16,

    /// Skip this many search hits
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Number of words to print after each match
    #[arg(long, default_value_t = 50)]
    after: usize,

    /// Number of words to print before each match
    #[arg(long, default_value_t = 50)]
    before: usize,

    /// Pages fetched per request (defaults to the mode's corpus ceiling)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// MediaWiki api.php endpoint
    #[arg(long, env = "WIKI_GREP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 2_000)]
    timeout_ms: u64,

    /// Cancel the whole run after this many seconds
    #[arg(long, env = "WIKI_GREP_DEADLINE_SECS")]
    deadline_secs: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Summary,
    Grep,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let output_mode = match self.mode {
            ModeArg::Summary => OutputMode::Summary,
            ModeArg::Grep => OutputMode::Grep,
        };
        let limit = usize::from(self.limit);

        PipelineConfig {
            term: self.word.clone(),
            search_mode: SearchMode::parse(&self.search),
            output_mode,
            limit,
            offset: self.offset,
            chunk_size: self
                .chunk_size
                .unwrap_or_else(|| output_mode.default_chunk_size(limit)),
            words_before: self.before,
            words_after: self.after,
            client: ClientConfig {
                endpoint: self.endpoint.clone(),
                timeout: Duration::from_millis(self.timeout_ms),
                ..Default::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config();
    let term = config.term.clone();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "wiki-grep boot"
    );

    let pipeline = Pipeline::wikipedia(config).context("failed to build pipeline")?;

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(cancel.clone(), cli.deadline_secs);

    let mut out = io::stdout();
    match pipeline
        .run(cancel.clone())
        .context("failed to start pipeline")?
    {
        RunOutput::Summaries(batches) => print_summaries(batches, &mut out).await?,
        RunOutput::Matches(results) => print_grep_results(results, &term, &mut out).await?,
    }

    if cancel.is_cancelled() {
        warn!("run cancelled before completion");
    }
    cancel.cancel();
    Ok(())
}

/// Ctrl-C and the optional deadline both fire the root token.
fn spawn_cancel_triggers(cancel: CancellationToken, deadline_secs: Option<u64>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = on_signal.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    warn!(%error, "unable to listen for ctrl-c");
                    return;
                }
                info!("ctrl-c received, cancelling");
                on_signal.cancel();
            }
        }
    });

    if let Some(seconds) = deadline_secs {
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(Duration::from_secs(seconds)) => {
                    warn!(seconds, "deadline reached, cancelling");
                    cancel.cancel();
                }
            }
        });
    }
}

async fn print_summaries(
    mut batches: mpsc::Receiver<EnrichedBatch>,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut received = 0usize;
    while let Some(batch) = batches.recv().await {
        for page in flatten_batch(batch) {
            received += 1;
            match page {
                Ok(page) => {
                    writeln!(out, "[{}] {} ({})", page.page_id, page.title, page.url)?;
                    writeln!(out, "{}\n", page.text.trim())?;
                }
                Err(error) => writeln!(out, "  error: {error}\n")?,
            }
        }
    }
    if received == 0 {
        writeln!(out, "no pages found")?;
    }
    Ok(())
}

async fn print_grep_results(
    mut results: mpsc::Receiver<MatchOutcome>,
    term: &str,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut pages = 0usize;
    let mut matches = 0usize;
    while let Some(outcome) = results.recv().await {
        match outcome {
            Ok(result) => {
                pages += 1;
                matches += result.snippets.len();
                writeln!(
                    out,
                    "[{}] {} ({}) matches={}",
                    result.page_id,
                    result.title,
                    result.url,
                    result.snippets.len()
                )?;
                for snippet in &result.snippets {
                    writeln!(out, "  ... {snippet} ...")?;
                }
                writeln!(out)?;
            }
            Err(error) => writeln!(out, "  error: {error}\n")?,
        }
    }
    writeln!(out, "term={term} pages={pages} matches={matches}")
}
