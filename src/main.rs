mod serve;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tenk_core::AppBuilder;
use tenk_core::decompose::DecomposeStrategy;
use tenk_index::filings::{load_manifest, save_manifest};

#[derive(Parser, Debug)]
#[command(
    name = "tenk",
    version,
    about = "Turn financial questions into dashboards grounded in SEC 10-K filings"
)]
struct Cli {
    /// Config file (falls back to TENK_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway and the dashboard worker
    Serve,

    /// Answer one question and write the dashboard
    Ask {
        question: String,

        /// Decomposition strategy (free or template)
        #[arg(long)]
        strategy: Option<DecomposeStrategy>,

        /// Where to write the HTML; prints to stdout when no path is configured
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch the filing list into the manifest
    Filings {
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Download filing text for every manifest entry
    Download {
        #[arg(long)]
        manifest: Option<PathBuf>,

        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Chunk, embed and index the filing text directory
    Ingest {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();
    let mut app = AppBuilder::from_env(cli.config.as_deref()).await?;

    match cli.command {
        Command::Serve => serve::run(app).await,
        Command::Ask {
            question,
            strategy,
            out,
        } => {
            if out.is_some() {
                app.config_mut().dashboard.output_path = out;
            }
            ask(&app, &question, strategy).await
        }
        Command::Filings {
            max_pages,
            manifest,
        } => {
            if max_pages.is_some() {
                app.config_mut().ingest.max_pages = max_pages;
            }
            let manifest = manifest.unwrap_or_else(|| app.config().ingest.manifest_path.clone());
            let records = app.build_filing_client()?.fetch_all().await?;
            save_manifest(&manifest, &records)
                .await
                .with_context(|| format!("writing {}", manifest.display()))?;
            println!("{} filings written to {}", records.len(), manifest.display());
            Ok(())
        }
        Command::Download { manifest, out_dir } => {
            let ingest = &app.config().ingest;
            let manifest = manifest.unwrap_or_else(|| ingest.manifest_path.clone());
            let out_dir = out_dir.unwrap_or_else(|| ingest.text_dir.clone());
            let records = load_manifest(&manifest)
                .await
                .with_context(|| format!("reading {}", manifest.display()))?;
            let report = app.build_fetcher().fetch_all(&records, &out_dir).await?;
            println!(
                "saved {} files to {} ({} without a link, {} failed)",
                report.saved.len(),
                out_dir.display(),
                report.skipped,
                report.errors.len()
            );
            Ok(())
        }
        Command::Ingest { dir } => {
            let dir = dir.unwrap_or_else(|| app.config().ingest.text_dir.clone());
            let provider = app.build_provider()?;
            let store = app.build_store()?;
            let report = app.build_indexer(store, provider).index_dir(&dir).await?;
            println!(
                "indexed {}/{} files, {} chunks in {} ms",
                report.files_indexed, report.files_scanned, report.chunks_created, report.duration_ms
            );
            for error in &report.errors {
                eprintln!("  {error}");
            }
            Ok(())
        }
    }
}

async fn ask(
    app: &AppBuilder,
    question: &str,
    strategy: Option<DecomposeStrategy>,
) -> anyhow::Result<()> {
    let workflow = app.build_workflow()?;
    let dashboard = match strategy {
        Some(strategy) => workflow.run_with_strategy(question, strategy).await?,
        None => workflow.run(question).await?,
    };

    for (i, q) in dashboard.sub_questions.iter().enumerate() {
        eprintln!("{:>2}. {q}", i + 1);
    }
    for failure in &dashboard.failed {
        eprintln!("retrieval failed for \"{}\": {}", failure.query, failure.reason);
    }
    match app.config().dashboard.output_path {
        Some(ref path) => println!("dashboard written to {}", path.display()),
        None => println!("{}", dashboard.html),
    }
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
