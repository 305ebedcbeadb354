//! `atelier-admin`: operator commands for an Atelier deployment.

use std::process::ExitCode;

use anyhow::Context;
use atelier_tools::{check, seed};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "atelier-admin")]
#[command(version)]
#[command(about = "Operator commands for the Atelier component catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the demo catalog and an admin account. Safe to run repeatedly.
    Seed {
        /// Email of the admin account to create or promote
        #[arg(long, env = "SEED_ADMIN_EMAIL", default_value = "admin@atelier.local")]
        admin_email: String,

        /// Password for a newly created admin account
        #[arg(long, env = "SEED_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,
    },

    /// Validate configuration and check the database and storage disk
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_tools=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            admin_email,
            admin_password,
        } => {
            let database_url =
                std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
            let pool = atelier_db::create_pool(&database_url)
                .await
                .context("connecting to the database")?;
            atelier_db::run_migrations(&pool)
                .await
                .context("running migrations")?;

            let report = seed::run(
                &pool,
                &seed::SeedOptions {
                    admin_email,
                    admin_password,
                },
            )
            .await?;

            if report.is_noop() {
                println!("Nothing to do, fixtures already present.");
            } else {
                println!(
                    "Seeded {} categories, {} subcategories, {} components, {} versions{}",
                    report.categories,
                    report.subcategories,
                    report.components,
                    report.versions,
                    if report.admin_created { " and the admin account" } else { "" },
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckConfig => {
            let report = check::run(&|name| std::env::var(name).ok()).await;
            report.print();
            if report.has_errors() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
