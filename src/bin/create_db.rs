//! Creates the directory database on a fresh Postgres server.
//!
//! The service also creates a missing database on first connect; this is for
//! provisioning ahead of time with a superuser connection.

use tokio_postgres::NoTls;

const DEFAULT_ADMIN_CONN: &str = "host=127.0.0.1 user=postgres dbname=postgres";
const DEFAULT_DB_NAME: &str = "business_directory";

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let conn_str = std::env::var("PG_ADMIN_CONN").unwrap_or_else(|_| DEFAULT_ADMIN_CONN.into());
    let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.into());

    if db_name.trim().is_empty() {
        return Err("DB_NAME must not be empty".into());
    }

    log::info!("Connecting to Postgres maintenance database");
    let (client, connection) = tokio_postgres::connect(&conn_str, NoTls).await?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            log::error!("Postgres connection error: {err}");
        }
    });

    let exists = client
        .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&db_name])
        .await?
        .is_some();

    if exists {
        log::info!("Database '{db_name}' already exists");
        return Ok(());
    }

    client
        .batch_execute(&format!("CREATE DATABASE {}", quote_identifier(&db_name)))
        .await?;
    log::info!("Database '{db_name}' created; start the service to apply migrations");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::quote_identifier;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("business_directory"), "\"business_directory\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
