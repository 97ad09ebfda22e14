mod catches;
mod config;
mod routes;
mod vision;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use catches::store::CatchStore;
use config::Config;
use routes::configure_routes;
use vision::service::VisionService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = Config::from_env().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Configuration error: {}", e),
        )
    })?;

    if config.openai_api_key.is_some() {
        log::info!("OpenAI credential detected, vision model: {}", config.vision_model);
    } else {
        log::warn!(
            "OPENAI_API_KEY is not set. Analyze requests will fail until it is configured."
        );
    }

    let vision_service = VisionService::new(&config).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("HTTP client setup failed: {}", e),
        )
    })?;

    let catch_store = CatchStore::load(config.catches_path.clone()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Catch store loading failed: {}", e),
        )
    })?;
    let catch_store = web::Data::new(catch_store);

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(vision_service.clone()))
            .app_data(catch_store.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
