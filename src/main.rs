use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod error;
mod models;
mod progress;
mod report;

use models::ReportingPeriod;
use report::MaskingPolicy;

#[derive(Parser)]
#[command(name = "caseload-progress")]
#[command(about = "IEP goal progress tracking and reporting for an SLP caseload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import session records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print per-goal progress ratings for one student
    Progress {
        #[arg(long)]
        student: String,
        #[arg(long)]
        quarter: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown progress report for one student
    Report {
        #[arg(long)]
        student: String,
        #[arg(long)]
        quarter: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Mask student-identifying text in the rendered report
        #[arg(long)]
        mask: bool,
    },
}

fn resolve_period(quarter: Option<u32>, year: Option<i32>) -> anyhow::Result<ReportingPeriod> {
    let today = Utc::now().date_naive();
    let quarter = quarter.unwrap_or((today.month0() / 3) + 1);
    let year = year.unwrap_or(today.year());
    Ok(ReportingPeriod::quarter(year, quarter)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

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
            println!("Inserted {inserted} sessions from {}.", csv.display());
        }
        Commands::Progress {
            student,
            quarter,
            year,
            json,
        } => {
            let period = resolve_period(quarter, year)?;
            let student = db::fetch_student(&pool, &student).await?;
            let goals = db::fetch_goals(&pool, student.id).await?;
            let sessions = db::fetch_sessions(&pool, student.id).await?;

            let records: Vec<_> = goals
                .iter()
                .map(|goal| report::assemble_goal_progress(goal, &sessions, &period))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                println!("No goals on file for {}.", student.full_name);
                return Ok(());
            }

            println!("{} - {}:", student.full_name, period.label);
            for record in &records {
                println!(
                    "- {} [{}] latest {}, average {}% across {} sessions",
                    record.goal_text,
                    record.progress_rating.label(),
                    record.current_performance,
                    record.average_accuracy,
                    record.data_points
                );
            }

            let billable = sessions.iter().filter(|s| s.billable).count();
            let codes: std::collections::BTreeSet<&str> = sessions
                .iter()
                .filter_map(|s| s.cpt_code.as_deref())
                .collect();
            if codes.is_empty() {
                println!("{} sessions on file, {billable} billable.", sessions.len());
            } else {
                println!(
                    "{} sessions on file, {billable} billable (CPT {}).",
                    sessions.len(),
                    codes.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
        }
        Commands::Report {
            student,
            quarter,
            year,
            out,
            mask,
        } => {
            let period = resolve_period(quarter, year)?;
            let masking = if mask {
                MaskingPolicy::MaskNames
            } else {
                MaskingPolicy::Off
            };
            let student = db::fetch_student(&pool, &student).await?;
            let goals = db::fetch_goals(&pool, student.id).await?;
            let sessions = db::fetch_sessions(&pool, student.id).await?;

            let rendered = report::build_report(&student, &goals, &sessions, &period, masking);
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
