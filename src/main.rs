use actix_web::{App, HttpServer, web};
use log::{error, info};
use std::io;

use quack_ledger::api;
use quack_ledger::blockchain::ChainService;
use quack_ledger::blockchain::target::difficulty_of;
use quack_ledger::config::NodeConfig;
use quack_ledger::storage::FileStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = NodeConfig::from_env();
    env_logger::init();

    let config = config.map_err(|e| {
        error!("invalid configuration: {e}");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let chain = FileStore::open(&config.data_dir)
        .and_then(|store| ChainService::open(store, config.target))
        .map_err(|e| {
            error!("could not open ledger in {}: {e}", config.data_dir.display());
            io::Error::other(e)
        })?;
    info!(
        "ledger head is block #{}, difficulty {}",
        chain.head().index,
        difficulty_of(config.target)
    );

    let state = web::Data::new(chain);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    });
    for port in &config.ports {
        println!("🦆 Starting ledger node at http://{}:{port}", config.host);
        server = server.bind((config.host.as_str(), *port))?;
    }

    server.run().await
}
