use std::{borrow::Cow, time::Duration};

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool,
};
use uuid::Uuid;

use crate::models::{
    Admin, AdminPrincipal, ApplicationDecision, ApplicationStatus, ApplicationType, Business,
    BusinessApplication, BusinessPayload, Category, DirectoryStats, NewBusinessApplication,
};
use crate::query::{listing_query, BuiltQuery, FilterSpec, SqlParam, APPLICATIONS, BUSINESSES};

const BUSINESS_COLUMNS: &str = BUSINESSES.columns;
const APPLICATION_COLUMNS: &str = APPLICATIONS.columns;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect_with(database_url.parse()?).await
    }

    pub async fn connect_with(options: PgConnectOptions) -> Result<Self, sqlx::Error> {
        let pool = match pool_options().connect_with(options.clone()).await {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(&options).await?;
                pool_options().connect_with(options).await?
            }
            Err(err) => return Err(err),
        };

        Ok(Self { pool })
    }

    /// Builds a pool without opening a connection until first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = pool_options().min_connections(0).connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Applies embedded migrations. Safe to run on every startup.
    pub async fn init_schema(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ========================================================================
    // LISTINGS
    // ========================================================================

    pub async fn list_businesses(&self, spec: &FilterSpec) -> Result<(Vec<Business>, i64), sqlx::Error> {
        let listing = listing_query(BUSINESSES, spec);
        let total = self.count(&listing.count).await?;

        let mut query = sqlx::query_as::<_, Business>(&listing.fetch.sql);
        for param in &listing.fetch.params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.as_str()),
                SqlParam::Int(value) => query.bind(*value),
            };
        }
        let businesses = query.fetch_all(&self.pool).await?;

        Ok((businesses, total))
    }

    pub async fn list_applications(
        &self,
        spec: &FilterSpec,
    ) -> Result<(Vec<BusinessApplication>, i64), sqlx::Error> {
        let listing = listing_query(APPLICATIONS, spec);
        let total = self.count(&listing.count).await?;

        let mut query = sqlx::query_as::<_, BusinessApplication>(&listing.fetch.sql);
        for param in &listing.fetch.params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.as_str()),
                SqlParam::Int(value) => query.bind(*value),
            };
        }
        let applications = query.fetch_all(&self.pool).await?;

        Ok((applications, total))
    }

    async fn count(&self, built: &BuiltQuery) -> Result<i64, sqlx::Error> {
        let mut query = sqlx::query_scalar::<_, i64>(&built.sql);
        for param in &built.params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.as_str()),
                SqlParam::Int(value) => query.bind(*value),
            };
        }
        query.fetch_one(&self.pool).await
    }

    /// Flagged businesses by name. When nothing is flagged this falls back to
    /// a random sample, so repeated calls may return different rows.
    pub async fn featured_businesses(&self, limit: i64) -> Result<Vec<Business>, sqlx::Error> {
        let featured = sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE featured = TRUE \
             ORDER BY business_name ASC, id ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        if !featured.is_empty() {
            return Ok(featured);
        }

        log::debug!("No featured businesses flagged, sampling {limit} at random");
        sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY RANDOM() LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_stats(&self) -> Result<DirectoryStats, sqlx::Error> {
        let (total_businesses, featured_businesses, total_categories, pending_applications) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM businesses),
                    (SELECT COUNT(*) FROM businesses WHERE featured = TRUE),
                    (SELECT COUNT(*) FROM categories),
                    (SELECT COUNT(*) FROM business_applications WHERE status = 'pending')
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(DirectoryStats {
            total_businesses,
            total_categories,
            featured_businesses,
            pending_applications,
        })
    }

    // ========================================================================
    // BUSINESSES
    // ========================================================================

    pub async fn get_business(&self, business_id: i32) -> Result<Option<Business>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = $1"
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create_business(&self, business: &BusinessPayload) -> Result<Business, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            r#"
            INSERT INTO businesses (
                business_name, category, location, contact_name, tel, email,
                website, description, featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(&business.business_name)
        .bind(&business.category)
        .bind(&business.location)
        .bind(&business.contact_name)
        .bind(&business.tel)
        .bind(&business.email)
        .bind(&business.website)
        .bind(&business.description)
        .bind(business.featured)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_business(
        &self,
        business_id: i32,
        business: &BusinessPayload,
    ) -> Result<Option<Business>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            r#"
            UPDATE businesses
            SET
                business_name = $2,
                category = $3,
                location = $4,
                contact_name = $5,
                tel = $6,
                email = $7,
                website = $8,
                description = $9,
                featured = $10
            WHERE id = $1
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(business_id)
        .bind(&business.business_name)
        .bind(&business.category)
        .bind(&business.location)
        .bind(&business.contact_name)
        .bind(&business.tel)
        .bind(&business.email)
        .bind(&business.website)
        .bind(&business.description)
        .bind(business.featured)
        .fetch_optional(&self.pool)
        .await
    }

    /// Deletes and returns the removed row so callers can run cleanup hooks.
    pub async fn delete_business(&self, business_id: i32) -> Result<Option<Business>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "DELETE FROM businesses WHERE id = $1 RETURNING {BUSINESS_COLUMNS}"
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn set_featured(&self, business_id: i32, featured: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE businesses SET featured = $2 WHERE id = $1")
            .bind(business_id)
            .bind(featured)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Replaces the image and returns the updated row with the previous path.
    pub async fn replace_business_image(
        &self,
        business_id: i32,
        image_url: &str,
    ) -> Result<Option<(Business, Option<String>)>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT image_url FROM businesses WHERE id = $1 FOR UPDATE",
        )
        .bind(business_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, Business>(&format!(
            "UPDATE businesses SET image_url = $2 WHERE id = $1 RETURNING {BUSINESS_COLUMNS}"
        ))
        .bind(business_id)
        .bind(image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some((updated, previous)))
    }

    /// Clears every flag and features a random sample of `count` businesses.
    pub async fn feature_random_sample(&self, count: i64) -> Result<Vec<Business>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE businesses SET featured = FALSE WHERE featured = TRUE")
            .execute(&mut *tx)
            .await?;

        let featured = sqlx::query_as::<_, Business>(&format!(
            r#"
            UPDATE businesses SET featured = TRUE
            WHERE id IN (SELECT id FROM businesses ORDER BY RANDOM() LIMIT $1)
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(count)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(featured)
    }

    // ========================================================================
    // BUSINESS APPLICATIONS
    // ========================================================================

    pub async fn create_application(
        &self,
        application: &NewBusinessApplication,
    ) -> Result<BusinessApplication, sqlx::Error> {
        sqlx::query_as::<_, BusinessApplication>(&format!(
            r#"
            INSERT INTO business_applications (
                business_name, location, category, contact_name, tel, email,
                website, description, image_url, status, application_type, business_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(&application.business_name)
        .bind(&application.location)
        .bind(&application.category)
        .bind(&application.contact_name)
        .bind(&application.tel)
        .bind(&application.email)
        .bind(&application.website)
        .bind(&application.description)
        .bind(&application.image_url)
        .bind(application.kind().as_str())
        .bind(application.business_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_application(
        &self,
        application_id: i32,
    ) -> Result<Option<BusinessApplication>, sqlx::Error> {
        sqlx::query_as::<_, BusinessApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM business_applications WHERE id = $1"
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Changes an application's status. The first transition to `approved`
    /// inserts a listing (new) or applies the fields to the target (edit)
    /// in the same transaction.
    pub async fn decide_application(
        &self,
        application_id: i32,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationDecision>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, BusinessApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM business_applications WHERE id = $1 FOR UPDATE"
        ))
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(existing) = existing else {
            tx.rollback().await?;
            return Ok(None);
        };

        let newly_approved = status == ApplicationStatus::Approved
            && ApplicationStatus::parse(&existing.status) != Some(ApplicationStatus::Approved);

        let mut business = None;
        let mut business_id = existing.business_id;

        if newly_approved {
            let kind = ApplicationType::parse(&existing.application_type)
                .unwrap_or(ApplicationType::New);

            let applied = match (kind, existing.business_id) {
                (ApplicationType::Edit, Some(target_id)) => {
                    sqlx::query_as::<_, Business>(&format!(
                        r#"
                        UPDATE businesses
                        SET
                            business_name = $2,
                            category = $3,
                            location = $4,
                            contact_name = $5,
                            tel = $6,
                            email = $7,
                            website = $8,
                            description = $9,
                            image_url = COALESCE($10, image_url)
                        WHERE id = $1
                        RETURNING {BUSINESS_COLUMNS}
                        "#
                    ))
                    .bind(target_id)
                    .bind(&existing.business_name)
                    .bind(&existing.category)
                    .bind(&existing.location)
                    .bind(&existing.contact_name)
                    .bind(&existing.tel)
                    .bind(&existing.email)
                    .bind(&existing.website)
                    .bind(&existing.description)
                    .bind(&existing.image_url)
                    .fetch_optional(&mut *tx)
                    .await?
                }
                (kind, _) => {
                    if kind == ApplicationType::Edit {
                        log::warn!(
                            "Edit application {application_id} has no target business; inserting as new"
                        );
                    }
                    let inserted = sqlx::query_as::<_, Business>(&format!(
                        r#"
                        INSERT INTO businesses (
                            business_name, category, location, contact_name, tel, email,
                            website, description, image_url
                        )
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                        RETURNING {BUSINESS_COLUMNS}
                        "#
                    ))
                    .bind(&existing.business_name)
                    .bind(&existing.category)
                    .bind(&existing.location)
                    .bind(&existing.contact_name)
                    .bind(&existing.tel)
                    .bind(&existing.email)
                    .bind(&existing.website)
                    .bind(&existing.description)
                    .bind(&existing.image_url)
                    .fetch_one(&mut *tx)
                    .await?;
                    Some(inserted)
                }
            };

            if let Some(applied) = &applied {
                business_id = Some(applied.id);
                if let Some(category) = applied.category.as_deref().filter(|c| !c.is_empty()) {
                    sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                        .bind(category)
                        .execute(&mut *tx)
                        .await?;
                }
            }
            business = applied;
        }

        let application = sqlx::query_as::<_, BusinessApplication>(&format!(
            r#"
            UPDATE business_applications
            SET status = $2, business_id = $3
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(application_id)
        .bind(status.as_str())
        .bind(business_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ApplicationDecision {
            application,
            business,
        }))
    }

    // ========================================================================
    // ADMINS & SESSIONS
    // ========================================================================

    pub async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(
            "SELECT id, username, password_hash, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_admin(&self, admin_id: i32) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(
            "SELECT id, username, password_hash, created_at FROM admins WHERE id = $1",
        )
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts an admin, or resets the password if the username exists.
    pub async fn upsert_admin(&self, username: &str, password_hash: &str) -> Result<Admin, sqlx::Error> {
        sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_admin_password(&self, admin_id: i32, password_hash: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE admins SET password_hash = $2 WHERE id = $1")
            .bind(admin_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn create_session(&self, admin_id: i32, ttl_hours: i64) -> Result<AdminPrincipal, sqlx::Error> {
        let ttl_hours = i32::try_from(ttl_hours).map_err(|_| {
            sqlx::Error::Configuration(format!("session TTL of {ttl_hours} hours is out of range").into())
        })?;

        sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        sqlx::query_as::<_, AdminPrincipal>(
            r#"
            WITH created AS (
                INSERT INTO admin_sessions (token, admin_id, expires_at)
                VALUES ($1, $2, NOW() + make_interval(hours => $3::int))
                RETURNING token, admin_id, expires_at
            )
            SELECT a.id, a.username, c.token, c.expires_at
            FROM created c
            INNER JOIN admins a ON a.id = c.admin_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(ttl_hours)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_session(&self, token: Uuid) -> Result<Option<AdminPrincipal>, sqlx::Error> {
        sqlx::query_as::<_, AdminPrincipal>(
            r#"
            SELECT a.id, a.username, s.token, s.expires_at
            FROM admin_sessions s
            INNER JOIN admins a ON a.id = s.admin_id
            WHERE s.token = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_session(&self, token: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM admin_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drops every session for the admin except `keep`.
    pub async fn delete_other_sessions(&self, admin_id: i32, keep: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE admin_id = $1 AND token <> $2")
            .bind(admin_id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(600)))
        .test_before_acquire(true)
}

async fn create_database_if_missing(options: &PgConnectOptions) -> Result<(), sqlx::Error> {
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // Already targeting the maintenance database.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");

    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
