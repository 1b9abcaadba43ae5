use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use backend::config::AppConfig;
use backend::routes::configure_routes;
use backend::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::from_env();
    log::info!(
        "Model: {:?} ({:?} variant), classes: {:?}, uploads: {:?}",
        config.model_path,
        config.variant,
        config.class_names_path,
        config.uploads_dir
    );

    let bind_address = config.bind_address();
    let state = web::Data::new(AppState::initialize(config));

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
