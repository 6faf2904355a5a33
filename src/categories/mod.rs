//! Operator-run category maintenance: consolidation, renames,
//! redistribution and backup/restore. Nothing here is on the request path.

pub mod backup;
pub mod consolidate;
pub mod mapping;

use std::path::PathBuf;

use thiserror::Error;

pub use backup::{list_backups, BackupFile, CategoryBackup, RestoreReport};
pub use consolidate::{ConsolidationPlan, ConsolidationReport, RedistributionReport, RenameReport};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid backup pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("backup file not found: {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("{0}")]
    Invalid(String),
}
