use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use business_directory::config::AppConfig;
use business_directory::database::Database;
use business_directory::handlers;
use business_directory::storage::ImageStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|msg| std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))?;
    let bind_address = config.bind_address();

    let db = Database::connect(&config.database_url).await.map_err(|err| {
        log::error!("Failed to initialize database: {err:?}");
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;

    match db.init_schema().await {
        Ok(()) => log::info!("DB schema ensured"),
        Err(err) => {
            log::error!("Failed to apply migrations: {err}");
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
        }
    }

    let store = ImageStore::new(config.upload_dir.clone(), config.max_upload_bytes);
    store.ensure_root().await?;
    log::info!("Storing uploaded images in {}", store.root().display());

    let db_data = web::Data::new(db);
    let store_data = web::Data::new(store);
    let config_data = web::Data::new(config);

    log::info!("Starting business directory service on {}", bind_address);

    HttpServer::new(move || {
        let cors = match config_data.cors_origin.as_deref() {
            Some(origin) => Cors::default().allowed_origin(origin),
            None => Cors::default().allow_any_origin(),
        }
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(store_data.clone())
            .app_data(config_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
