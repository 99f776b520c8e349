use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use quote_desk_api::{config::AppConfig, routes, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    log::info!("Application starting...");

    let config = AppConfig::from_env();
    let host = config.host.clone();
    let port = config.port;
    let jwt_secret = config.jwt_secret.clone();

    let state = web::Data::new(AppState::from_config(config).await?);

    log::info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let secret = jwt_secret.clone();
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(4 * 1024 * 1024))
            .configure(move |cfg| routes::config(cfg, &secret))
    })
    .bind((host, port))?
    .run()
    .await
}
