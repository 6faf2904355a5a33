use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::mapping::{canonical_categories, canonical_for_key, is_canonical, normalize_label};
use super::MigrationError;
use crate::database::Database;

/// All legacy values sharing one normalized key, and where they go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRewrite {
    pub key: String,
    pub canonical: &'static str,
    pub legacy_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationPlan {
    pub rewrites: Vec<CategoryRewrite>,
    pub unmapped: BTreeSet<String>,
}

impl ConsolidationPlan {
    /// Groups distinct category values by normalized key. Values that already
    /// equal a canonical label are neither rewritten nor reported, so a second
    /// run is a no-op.
    pub fn from_distinct<I, S>(distinct: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups: BTreeMap<String, (&'static str, Vec<String>)> = BTreeMap::new();
        let mut unmapped = BTreeSet::new();

        for value in distinct {
            let value = value.as_ref();
            let key = normalize_label(value);
            if key.is_empty() {
                continue;
            }
            match canonical_for_key(&key) {
                Some(canonical) => {
                    let entry = groups.entry(key).or_insert_with(|| (canonical, Vec::new()));
                    if value != canonical {
                        entry.1.push(value.to_string());
                    }
                }
                None if is_canonical(value) => {}
                None => {
                    unmapped.insert(value.to_string());
                }
            }
        }

        let rewrites = groups
            .into_iter()
            .filter(|(_, (_, legacy_values))| !legacy_values.is_empty())
            .map(|(key, (canonical, legacy_values))| CategoryRewrite {
                key,
                canonical,
                legacy_values,
            })
            .collect();

        Self { rewrites, unmapped }
    }

    pub fn is_noop(&self) -> bool {
        self.rewrites.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub updated_count: u64,
    pub canonical_categories_installed: Vec<String>,
    pub unmapped_legacy_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenameReport {
    pub businesses_updated: u64,
    pub categories_updated: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RedistributionReport {
    pub target: String,
    pub businesses_moved: u64,
    pub missing_ids: Vec<i32>,
    pub category_dropped: bool,
}

impl Database {
    pub async fn distinct_business_categories(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM businesses \
             WHERE category IS NOT NULL AND category <> '' ORDER BY category",
        )
        .fetch_all(self.pool())
        .await
    }

    /// Replaces the category table with the canonical set and rewrites every
    /// mapped business in one transaction. Any error rolls everything back.
    pub async fn consolidate_categories(&self) -> Result<ConsolidationReport, MigrationError> {
        let mut tx = self.pool().begin().await?;

        let distinct = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM businesses \
             WHERE category IS NOT NULL AND category <> '' ORDER BY category",
        )
        .fetch_all(&mut *tx)
        .await?;

        let plan = ConsolidationPlan::from_distinct(&distinct);
        let canonical = canonical_categories();

        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        for name in &canonical {
            sqlx::query("INSERT INTO categories (name) VALUES ($1)")
                .bind(*name)
                .execute(&mut *tx)
                .await?;
        }

        let mut updated_count = 0;
        for rewrite in &plan.rewrites {
            let result = sqlx::query(
                "UPDATE businesses SET category = $1 \
                 WHERE LOWER(TRIM(category)) = $2 AND category <> $1",
            )
            .bind(rewrite.canonical)
            .bind(&rewrite.key)
            .execute(&mut *tx)
            .await?;

            let affected = result.rows_affected();
            updated_count += affected;
            log::info!(
                "Updated {:?} -> '{}' ({} businesses)",
                rewrite.legacy_values,
                rewrite.canonical,
                affected
            );
        }

        for label in &plan.unmapped {
            log::warn!("Unmapped category left unchanged: '{label}'");
        }

        tx.commit().await?;

        Ok(ConsolidationReport {
            updated_count,
            canonical_categories_installed: canonical.iter().map(|c| c.to_string()).collect(),
            unmapped_legacy_labels: plan.unmapped.into_iter().collect(),
        })
    }

    /// Renames a category in both the lookup table and every business.
    pub async fn rename_category(&self, from: &str, to: &str) -> Result<RenameReport, MigrationError> {
        let mut tx = self.pool().begin().await?;

        let businesses_updated = sqlx::query("UPDATE businesses SET category = $2 WHERE category = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let target_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories WHERE name = $1")
            .bind(to)
            .fetch_one(&mut *tx)
            .await?
            > 0;

        let categories_updated = if target_exists {
            sqlx::query("DELETE FROM categories WHERE name = $1")
                .bind(from)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            sqlx::query("UPDATE categories SET name = $2 WHERE name = $1")
                .bind(from)
                .bind(to)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        };

        tx.commit().await?;

        log::info!("Renamed '{from}' -> '{to}': {businesses_updated} businesses, {categories_updated} category rows");
        Ok(RenameReport {
            businesses_updated,
            categories_updated,
        })
    }

    /// Moves specific businesses to `target`, optionally dropping a label
    /// from the lookup table afterwards.
    pub async fn redistribute_businesses(
        &self,
        ids: &[i32],
        target: &str,
        drop_category: Option<&str>,
    ) -> Result<RedistributionReport, MigrationError> {
        let mut tx = self.pool().begin().await?;

        let moved: Vec<i32> = sqlx::query_scalar::<_, i32>(
            "UPDATE businesses SET category = $2 WHERE id = ANY($1) RETURNING id",
        )
        .bind(ids)
        .bind(target)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(target)
            .execute(&mut *tx)
            .await?;

        let category_dropped = match drop_category {
            Some(name) => {
                sqlx::query("DELETE FROM categories WHERE name = $1")
                    .bind(name)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected()
                    > 0
            }
            None => false,
        };

        tx.commit().await?;

        let moved_set: BTreeSet<i32> = moved.iter().copied().collect();
        let missing_ids = ids.iter().copied().filter(|id| !moved_set.contains(id)).collect();

        Ok(RedistributionReport {
            target: target.to_string(),
            businesses_moved: moved.len() as u64,
            missing_ids,
            category_dropped,
        })
    }

    /// Category name with business count, largest first.
    pub async fn category_distribution(&self) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category, COUNT(*) AS business_count
            FROM businesses
            WHERE category IS NOT NULL AND category <> ''
            GROUP BY category
            ORDER BY business_count DESC, category ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Applies a plan to in-memory categories the way the UPDATE statement does.
    fn apply(plan: &ConsolidationPlan, rows: &mut [String]) -> u64 {
        let mut changed = 0;
        for rewrite in &plan.rewrites {
            for row in rows.iter_mut() {
                if normalize_label(row) == rewrite.key && row.as_str() != rewrite.canonical {
                    *row = rewrite.canonical.to_string();
                    changed += 1;
                }
            }
        }
        changed
    }

    fn distinct(rows: &[String]) -> BTreeSet<String> {
        rows.iter().filter(|r| !r.trim().is_empty()).cloned().collect()
    }

    #[test]
    fn maps_legacy_labels_and_reports_the_rest() {
        let plan = ConsolidationPlan::from_distinct([
            "accounting",
            "ACCOUNTING & TAX SERVICES",
            "florist",
            "Underwater Basket Weaving",
        ]);

        let targets: Vec<(&str, &str)> = plan
            .rewrites
            .iter()
            .map(|r| (r.key.as_str(), r.canonical))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("accounting", "Professional Services"),
                ("accounting & tax services", "Professional Services"),
                ("florist", "Specialty Services"),
            ]
        );
        assert_eq!(
            plan.unmapped.iter().collect::<Vec<_>>(),
            vec!["Underwater Basket Weaving"]
        );
    }

    #[test]
    fn concrete_dataset_is_rewritten() {
        let mut rows: Vec<String> = ["accounting", "ACCOUNTING & TAX SERVICES", "florist"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let plan = ConsolidationPlan::from_distinct(distinct(&rows));
        assert_eq!(apply(&plan, &mut rows), 3);
        assert_eq!(
            rows,
            vec!["Professional Services", "Professional Services", "Specialty Services"]
        );
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut rows: Vec<String> = [
            "Restaurants",
            "restaurant ",
            "Food & Dining",
            "BARBER SHOPS",
            "church",
            "Mystery Category",
            "",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let first = ConsolidationPlan::from_distinct(distinct(&rows));
        assert_eq!(apply(&first, &mut rows), 4);

        let second = ConsolidationPlan::from_distinct(distinct(&rows));
        assert!(second.is_noop());
        assert_eq!(apply(&second, &mut rows), 0);
        assert_eq!(second.unmapped, first.unmapped);
    }

    #[test]
    fn variants_of_one_key_share_a_rewrite() {
        let plan = ConsolidationPlan::from_distinct(["Bakery", "BAKERY", " bakery"]);
        assert_eq!(plan.rewrites.len(), 1);
        assert_eq!(plan.rewrites[0].key, "bakery");
        assert_eq!(plan.rewrites[0].legacy_values.len(), 3);
    }

    #[test]
    fn blank_values_are_neither_mapped_nor_reported() {
        let plan = ConsolidationPlan::from_distinct(["", "   "]);
        assert!(plan.is_noop());
        assert!(plan.unmapped.is_empty());
    }
}
