use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

mod cohort;
mod completion;
mod db;
mod engine;
mod enrollment;
mod error;
mod filters;
mod grading;
mod models;
mod nps;
mod report;

use engine::{EngineConfig, MetricsEngine};
use filters::{DateWindow, LevelFilter, WeekMode};

#[derive(Parser)]
#[command(name = "builder-metrics")]
#[command(about = "Completion and NPS metrics engine for builder cohorts", long_about = None)]
struct Cli {
    /// Cohort that untagged legacy curriculum days belong to.
    #[arg(long, global = true, default_value = "March 2025")]
    legacy_cohort: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import enrollment rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Per-builder task completion against their cohort
    Completion {
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
        /// Composite "<cohort> - <level>" filter
        #[arg(long)]
        level: Option<String>,
    },
    /// Weekly NPS buckets per cohort
    WeeklyNps {
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, value_enum, default_value = "calendar")]
        mode: WeekMode,
    },
    /// Per-cohort NPS summary (latest week and all time)
    CohortSummary {
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
        #[arg(long)]
        cohort: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("builder_metrics=info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let engine = MetricsEngine::new(
        pool.clone(),
        EngineConfig {
            legacy_cohort: cli.legacy_cohort.clone(),
        },
    );

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} enrollment rows from {}.", csv.display());
        }
        Commands::Completion {
            start_date,
            end_date,
            level,
        } => {
            let window = DateWindow::new(start_date, end_date)?;
            let level_filter = level.as_deref().map(LevelFilter::parse).transpose()?;
            let rows = engine
                .completion(&window, level_filter.as_ref(), &cancel)
                .await?;

            if rows.is_empty() {
                println!("No builders found for this window.");
                return Ok(());
            }

            for row in rows {
                println!(
                    "- {} ({} - {}): {}",
                    row.name,
                    if row.cohort.is_empty() { "unassigned" } else { &row.cohort },
                    if row.level.is_empty() { "?" } else { &row.level },
                    row.percentage
                        .map(|pct| format!("{pct}%"))
                        .unwrap_or_else(|| "n/a".to_string())
                );
            }
        }
        Commands::WeeklyNps {
            start_date,
            end_date,
            cohort,
            mode,
        } => {
            let window = DateWindow::new(start_date, end_date)?;
            let rows = engine
                .weekly_nps(&window, cohort.as_deref(), mode, &cancel)
                .await?;

            if rows.is_empty() {
                println!("No survey responses found for this window.");
                return Ok(());
            }

            for row in rows {
                println!(
                    "- {} {}: NPS {} ({} promoters / {} passives / {} detractors of {})",
                    row.cohort,
                    row.week,
                    row.nps
                        .map(|nps| format!("{nps:.0}"))
                        .unwrap_or_else(|| "n/a".to_string()),
                    row.promoters,
                    row.passives,
                    row.detractors,
                    row.total_responses
                );
            }
        }
        Commands::CohortSummary {
            start_date,
            end_date,
            cohort,
        } => {
            let window = DateWindow::new(start_date, end_date)?;
            let rows = engine
                .cohort_summary(&window, cohort.as_deref(), &cancel)
                .await?;

            if rows.is_empty() {
                println!("No cohorts with responses in this window.");
                return Ok(());
            }

            for row in rows {
                println!(
                    "- {}: this week {}, all time {}",
                    row.cohort,
                    row.nps_this_week
                        .map(|nps| format!("{nps:.0}"))
                        .unwrap_or_else(|| "n/a".to_string()),
                    row.nps_all_time
                        .map(|nps| format!("{nps:.0}"))
                        .unwrap_or_else(|| "n/a".to_string())
                );
            }
        }
        Commands::Report {
            start_date,
            end_date,
            out,
        } => {
            let window = DateWindow::new(start_date, end_date)?;
            let completion = engine.completion(&window, None, &cancel).await?;
            let weekly = engine
                .weekly_nps(&window, None, WeekMode::Calendar, &cancel)
                .await?;
            let summary = nps::cohort_summary(&weekly);
            let responses = db::fetch_survey_responses(&pool, &window).await?;
            let report = report::build_report(&window, &completion, &weekly, &summary, &responses);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
