//! Operator tool for category maintenance and admin provisioning.
//!
//! Every command that rewrites data asks for confirmation first unless
//! `--yes` is given.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Password};

use business_directory::auth;
use business_directory::categories::{list_backups, CategoryBackup, ConsolidationPlan};
use business_directory::database::Database;

type CliResult = Result<(), Box<dyn std::error::Error>>;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Parser)]
#[command(name = "directory_ctl")]
#[command(about = "Category maintenance and admin tooling for the business directory")]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Directory holding category backups
    #[arg(long, env = "BACKUP_DIR", default_value = "backups")]
    backup_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a JSON snapshot of categories and business categories
    Backup,

    /// Replay a backup file
    Restore {
        file: PathBuf,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show available backups, newest first
    ListBackups,

    /// Collapse legacy category labels onto the canonical set
    Consolidate {
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Rename a category in the lookup table and on every business
    RenameCategory {
        from: String,
        to: String,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Move specific businesses to another category
    Redistribute {
        /// Target category
        #[arg(long)]
        to: String,
        /// Comma-separated business ids
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i32>,
        /// Category label to remove from the lookup table afterwards
        #[arg(long)]
        drop_category: Option<String>,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Backup, then consolidate, with a single confirmation
    Migrate {
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Create an admin account, or reset its password
    CreateAdmin { username: String },

    /// Clear featured flags and feature a random sample
    FeatureRandom {
        #[arg(long, default_value_t = 6)]
        count: i64,
    },

    /// Business count per category
    Distribution,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    let db = Database::connect(&cli.database_url).await?;
    db.init_schema().await?;

    match cli.command {
        Command::Backup => {
            backup(&db, &cli.backup_dir).await?;
        }
        Command::Restore { file, yes } => restore(&db, &file, yes).await?,
        Command::ListBackups => show_backups(&cli.backup_dir)?,
        Command::Consolidate { yes } => consolidate(&db, yes).await?,
        Command::RenameCategory { from, to, yes } => {
            if !confirm(&format!("Rename category '{from}' to '{to}'?"), yes)? {
                return Ok(());
            }
            let report = db.rename_category(&from, &to).await?;
            println!(
                "Renamed '{from}' -> '{to}': {} businesses, {} category rows",
                report.businesses_updated, report.categories_updated
            );
        }
        Command::Redistribute {
            to,
            ids,
            drop_category,
            yes,
        } => {
            let mut prompt = format!("Move {} business(es) to '{to}'", ids.len());
            if let Some(dropped) = &drop_category {
                prompt.push_str(&format!(" and remove category '{dropped}'"));
            }
            if !confirm(&format!("{prompt}?"), yes)? {
                return Ok(());
            }

            let report = db
                .redistribute_businesses(&ids, &to, drop_category.as_deref())
                .await?;
            println!("Moved {} business(es) to '{}'", report.businesses_moved, report.target);
            if !report.missing_ids.is_empty() {
                log::warn!("No business found for ids {:?}", report.missing_ids);
            }
            if let Some(dropped) = drop_category {
                if report.category_dropped {
                    println!("Removed category '{dropped}'");
                } else {
                    log::warn!("Category '{dropped}' was not in the lookup table");
                }
            }
        }
        Command::Migrate { yes } => {
            if !confirm("Back up categories and then consolidate them?", yes)? {
                return Ok(());
            }
            let path = backup(&db, &cli.backup_dir).await?;
            log::info!("Restore with: directory_ctl restore {}", path.display());
            consolidate(&db, true).await?;
        }
        Command::CreateAdmin { username } => create_admin(&db, &username).await?,
        Command::FeatureRandom { count } => {
            if count <= 0 {
                return Err("--count must be positive".into());
            }
            let featured = db.feature_random_sample(count).await?;
            println!("Featured {} business(es):", featured.len());
            for business in featured {
                println!("  {:>6}  {}", business.id, business.business_name);
            }
        }
        Command::Distribution => {
            let distribution = db.category_distribution().await?;
            let total: i64 = distribution.iter().map(|(_, count)| count).sum();
            for (category, count) in &distribution {
                println!("{count:>6}  {category}");
            }
            println!("{total:>6}  total across {} categories", distribution.len());
        }
    }

    Ok(())
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, dialoguer::Error> {
    if assume_yes {
        return Ok(true);
    }
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    if !confirmed {
        println!("Aborted, no changes made");
    }
    Ok(confirmed)
}

async fn backup(db: &Database, dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let snapshot = db.snapshot_categories().await?;
    let path = snapshot.write_to_dir(dir)?;
    println!(
        "Backed up {} categories and {} businesses to {}",
        snapshot.categories.len(),
        snapshot.businesses.len(),
        path.display()
    );
    Ok(path)
}

async fn restore(db: &Database, file: &Path, yes: bool) -> CliResult {
    let snapshot = CategoryBackup::read_from(file)?;
    let prompt = format!(
        "Restore {} categories and {} business categories from {}?",
        snapshot.categories.len(),
        snapshot.businesses.len(),
        snapshot.backup_timestamp
    );
    if !confirm(&prompt, yes)? {
        return Ok(());
    }

    let report = db.restore_categories(&snapshot).await?;
    println!(
        "Restored {} categories and {} businesses",
        report.categories_restored, report.businesses_restored
    );
    if report.businesses_restored < snapshot.businesses.len() as u64 {
        log::warn!(
            "{} business(es) in the backup no longer exist",
            snapshot.businesses.len() as u64 - report.businesses_restored
        );
    }
    Ok(())
}

fn show_backups(dir: &Path) -> CliResult {
    let backups = list_backups(dir)?;
    if backups.is_empty() {
        println!("No backups in {}", dir.display());
        return Ok(());
    }
    for backup in backups {
        println!(
            "{}  {:>9} bytes  {}",
            backup.modified.format("%Y-%m-%d %H:%M:%S"),
            backup.size,
            backup.path.display()
        );
    }
    Ok(())
}

async fn consolidate(db: &Database, yes: bool) -> CliResult {
    let plan = ConsolidationPlan::from_distinct(db.distinct_business_categories().await?);

    for rewrite in &plan.rewrites {
        println!("  {:?} -> {}", rewrite.legacy_values, rewrite.canonical);
    }
    if plan.is_noop() {
        println!("All mapped categories are already canonical");
    }
    if !confirm(
        &format!("Apply {} category rewrite(s)?", plan.rewrites.len()),
        yes,
    )? {
        return Ok(());
    }

    let report = db.consolidate_categories().await?;
    println!("Updated {} business(es)", report.updated_count);
    println!(
        "Installed {} canonical categories",
        report.canonical_categories_installed.len()
    );
    if !report.unmapped_legacy_labels.is_empty() {
        println!("Unmapped categories left unchanged:");
        for label in &report.unmapped_legacy_labels {
            println!("  {label}");
        }
    }
    Ok(())
}

async fn create_admin(db: &Database, username: &str) -> CliResult {
    let username = username.trim();
    if username.is_empty() {
        return Err("username must not be empty".into());
    }

    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Password for '{username}'"))
        .with_confirmation("Repeat password", "Passwords do not match")
        .validate_with(|input: &String| -> Result<(), String> {
            if input.len() >= MIN_PASSWORD_LEN {
                Ok(())
            } else {
                Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters"))
            }
        })
        .interact()?;

    let password_hash = auth::hash_password(&password).map_err(|err| err.to_string())?;
    let admin = db.upsert_admin(username, &password_hash).await?;
    println!("Admin '{}' saved (id {})", admin.username, admin.id);
    Ok(())
}
