//! Abracadabra CLI - tutorial progress from the terminal.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use abracadabra_core::{timestamp, ProgressEvent, SystemClock, Time, TutorialId};
use abracadabra_storage::JsonStorage;
use abracadabra_progress::{ProgressStore, ProgressUi, StoreConfig, DEFAULT_STORAGE_KEY};

#[derive(Parser)]
#[command(name = "abracadabra")]
#[command(about = "Track progress through the npm workflow tutorials", long_about = None)]
struct Cli {
    /// Directory holding saved progress
    #[arg(long, global = true, default_value = ".abracadabra")]
    data_dir: std::path::PathBuf,

    /// Storage key progress is saved under
    #[arg(long, global = true, default_value = DEFAULT_STORAGE_KEY)]
    key: String,

    /// Do not count repeat completions as visits
    #[arg(long, global = true)]
    strict_completions: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a visit to a tutorial
    Visit {
        /// Tutorial ID
        #[arg(value_parser = parse_tutorial)]
        tutorial: TutorialId,
    },
    /// Record a visit from a page path such as /docs/npm-basics.html
    VisitPage {
        /// Page path
        path: String,
    },
    /// Mark a tutorial as complete
    Complete {
        /// Tutorial ID
        #[arg(value_parser = parse_tutorial)]
        tutorial: TutorialId,
    },
    /// Show the progress bar and badges
    Status,
    /// Show per-tutorial details
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tutorials
    List,
    /// Clear all progress
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Open storage
    let storage = JsonStorage::new(&cli.data_dir).await?;
    let config = StoreConfig {
        storage_key: cli.key,
        count_repeat_completions: !cli.strict_completions,
    };
    let mut store = ProgressStore::new(storage, SystemClock).with_config(config);
    store.load().await;
    let subscription = store.subscribe(|event| match event {
        ProgressEvent::Visited { tutorial, record } => {
            debug!("Visited {} ({} visits)", tutorial, record.visits)
        }
        ProgressEvent::Completed { tutorial, record } => {
            debug!("Completed {} ({} visits)", tutorial, record.visits)
        }
        ProgressEvent::Reset => debug!("Progress cleared"),
    });
    debug!("Logging progress changes (listener {})", subscription);
    let mut ui = ProgressUi::new(store);

    match cli.command {
        Commands::Visit { tutorial } => {
            ui.visit(tutorial).await;
            let record = ui.store().record(tutorial);
            println!("Visited {} ({} visits)", tutorial.title(), record.visits);
        }
        Commands::VisitPage { path } => {
            let Some(tutorial) = TutorialId::from_page_path(&path) else {
                println!("Not a tutorial page: {}", path);
                return Ok(());
            };
            ui.visit(tutorial).await;
            let record = ui.store().record(tutorial);
            println!("Visited {} ({} visits)", tutorial.title(), record.visits);
        }
        Commands::Complete { tutorial } => {
            match ui.mark_complete(tutorial).await {
                Some(toast) => println!("{}", toast.message),
                None => println!("Already completed: {}", tutorial.title()),
            }
            print!("{}", ui.view().render());
        }
        Commands::Status => {
            print!("{}", ui.view().render());
        }
        Commands::Report { json } => {
            let report = ui.store().report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!(
                "Tutorials: {}/{} completed ({}%)",
                report.completed, report.total_tutorials, report.percentage
            );
            for detail in &report.details {
                println!(
                    "  {:<22} | {:<4} | {:>3} visits | first {} | last {} | completed {}",
                    detail.tutorial,
                    if detail.completed { "DONE" } else { "-" },
                    detail.visits,
                    format_time(detail.first_visited),
                    format_time(detail.last_visited),
                    format_time(detail.completed_at),
                );
            }
        }
        Commands::List => {
            for tutorial in TutorialId::ALL {
                let mark = if ui.store().is_completed(tutorial) { 'x' } else { ' ' };
                println!("  [{}] {:<22} {}", mark, tutorial, tutorial.title());
            }
        }
        Commands::Reset => {
            ui.reset().await;
            println!("Progress reset");
        }
    }

    Ok(())
}

fn parse_tutorial(s: &str) -> std::result::Result<TutorialId, String> {
    s.parse().map_err(|e| {
        let valid: Vec<&str> = TutorialId::ALL.iter().map(|id| id.as_str()).collect();
        format!("{} (expected one of: {})", e, valid.join(", "))
    })
}

fn format_time(time: Option<Time>) -> String {
    time.map(|t| timestamp::format(&t))
        .unwrap_or_else(|| "never".to_string())
}
