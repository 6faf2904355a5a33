use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::MigrationError;
use crate::database::Database;
use crate::models::Category;

const BACKUP_PREFIX: &str = "category_backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct BusinessCategory {
    pub id: i32,
    pub business_name: String,
    pub category: String,
}

/// Point-in-time copy of the category table and every business's category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryBackup {
    pub backup_timestamp: String,
    pub categories: Vec<Category>,
    pub businesses: Vec<BusinessCategory>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RestoreReport {
    pub categories_restored: usize,
    pub businesses_restored: u64,
}

#[derive(Debug, Clone)]
pub struct BackupFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

impl CategoryBackup {
    pub fn file_name(&self) -> String {
        format!("{BACKUP_PREFIX}{}.json", self.backup_timestamp)
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, MigrationError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(path)
    }

    pub fn read_from(path: &Path) -> Result<Self, MigrationError> {
        if !path.exists() {
            return Err(MigrationError::BackupNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Backups in `dir`, newest first.
pub fn list_backups(dir: &Path) -> Result<Vec<BackupFile>, MigrationError> {
    let pattern = dir.join(format!("{BACKUP_PREFIX}*.json"));
    let mut backups = Vec::new();

    for entry in glob::glob(&pattern.to_string_lossy())? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                log::warn!("Skipping unreadable backup entry: {err}");
                continue;
            }
        };
        let metadata = fs::metadata(&path)?;
        let modified: DateTime<Local> = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH).into();
        backups.push(BackupFile {
            path,
            size: metadata.len(),
            modified,
        });
    }

    backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    Ok(backups)
}

impl Database {
    pub async fn snapshot_categories(&self) -> Result<CategoryBackup, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;

        let businesses = sqlx::query_as::<_, BusinessCategory>(
            r#"
            SELECT id, business_name, category
            FROM businesses
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CategoryBackup {
            backup_timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            categories,
            businesses,
        })
    }

    /// Replays a backup verbatim in one transaction.
    pub async fn restore_categories(&self, backup: &CategoryBackup) -> Result<RestoreReport, MigrationError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;

        for category in &backup.categories {
            sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
                .bind(category.id)
                .bind(&category.name)
                .execute(&mut *tx)
                .await?;
        }

        // Explicit ids bypass the sequence; move it past the restored rows.
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('categories', 'id'), \
             COALESCE((SELECT MAX(id) FROM categories), 0) + 1, false)",
        )
        .execute(&mut *tx)
        .await?;

        let mut businesses_restored = 0;
        for business in &backup.businesses {
            let affected = sqlx::query("UPDATE businesses SET category = $2 WHERE id = $1")
                .bind(business.id)
                .bind(&business.category)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if affected > 0 {
                businesses_restored += 1;
            }
        }

        tx.commit().await?;

        Ok(RestoreReport {
            categories_restored: backup.categories.len(),
            businesses_restored,
        })
    }
}
