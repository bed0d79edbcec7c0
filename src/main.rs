use actix_web::{web, App, HttpServer};
use log::{info, warn};

use court_artefacts::api;
use court_artefacts::app_state::AppState;
use court_artefacts::config::AppConfig;
use court_artefacts::service::archival_worker::ArchivalWorker;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().expect("Failed to load configuration");
    if let Err(e) = log4rs::init_file(&config.logging.config_file, Default::default()) {
        env_logger::init();
        warn!(
            "Could not load log config {} ({}), logging to stderr",
            config.logging.config_file, e
        );
    }

    let state = AppState::from_config(config.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    if config.archival.enabled {
        ArchivalWorker::new(state.lifecycle.clone(), &config.archival).start_background();
    } else {
        info!("Archival worker disabled");
    }

    let state = web::Data::new(state);
    info!("Starting server on {}:{}", config.server.host, config.server.port);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .workers(config.server.workers.max(1))
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
