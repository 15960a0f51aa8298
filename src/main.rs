mod cli;

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vecdocs::config::{Cli, Command};
use vecdocs::server::AppState;
use vecdocs::VecStore;

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => {
            let store = VecStore::load_or_new(&cli.store.db, cli.store.embedder_config())
                .map_err(std::io::Error::other)?;
            let state = web::Data::new(AppState::new(store, &cli.store.db));

            tracing::info!("Serving {:?} on {}:{}", cli.store.db, host, port);
            HttpServer::new(move || {
                App::new()
                    .app_data(state.clone())
                    .wrap(middleware::NormalizePath::trim())
                    .wrap(middleware::Logger::default())
                    .configure(vecdocs::server::config)
            })
            .bind((host.as_str(), port))?
            .run()
            .await?;
        }
        command => {
            if let Err(e) = cli::run_single_command(&cli.store, command) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
