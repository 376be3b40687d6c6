use axum::extract::Extension;
use axum::routing::{delete, get, post};
use axum::Router;
use distributed_search::barrel::{handlers as barrel_handlers, protocol as barrel_protocol};
use distributed_search::barrel::service::Barrel;
use distributed_search::config::Config;
use distributed_search::crawler::Crawler;
use distributed_search::gateway::frontier::Frontier;
use distributed_search::gateway::service::GatewayService;
use distributed_search::gateway::{handlers as gateway_handlers, protocol as gateway_protocol};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <gateway|barrel|crawler> [options]", args[0]);
        eprintln!("Options: --bind <addr:port> --gateway <url> --id <barrel id> --config <file.json>");
        eprintln!("Example: {} gateway --bind 127.0.0.1:7000", args[0]);
        eprintln!(
            "Example: {} barrel --id 1 --bind 127.0.0.1:7101 --gateway http://127.0.0.1:7000",
            args[0]
        );
        eprintln!("Example: {} crawler --gateway http://127.0.0.1:7000", args[0]);

        std::process::exit(1);
    }

    let role = args[1].clone();

    let mut bind_addr: Option<String> = None;
    let mut gateway_addr: Option<String> = None;
    let mut barrel_id: Option<u32> = None;
    let mut config_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--gateway" => {
                gateway_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--id" => {
                barrel_id = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--config" => {
                config_path = Some(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let mut config = Config::load_or_default(config_path.as_deref())?;
    if let Some(bind_addr) = bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(gateway_addr) = gateway_addr {
        config.gateway_addr = gateway_addr;
    }
    if let Some(barrel_id) = barrel_id {
        config.barrel_id = barrel_id;
    }

    match role.as_str() {
        "gateway" => run_gateway(config).await,
        "barrel" => run_barrel(config).await,
        "crawler" => run_crawler(config).await,
        other => {
            eprintln!("Unknown role '{}', expected gateway, barrel or crawler", other);
            std::process::exit(1);
        }
    }
}

async fn run_gateway(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting gateway on {}", config.bind_addr);

    let frontier = Arc::new(Frontier::new(config.max_crawl_depth));
    let service = GatewayService::new(&config);

    let app = Router::new()
        .route(gateway_protocol::ENDPOINT_INDEX, post(gateway_handlers::handle_index_url))
        .route(gateway_protocol::ENDPOINT_QUEUE, post(gateway_handlers::handle_queue_url))
        .route(gateway_protocol::ENDPOINT_POPQUEUE, get(gateway_handlers::handle_popqueue))
        .route(gateway_protocol::ENDPOINT_SEARCH, get(gateway_handlers::handle_search))
        .route(gateway_protocol::ENDPOINT_LINKED, get(gateway_handlers::handle_linked))
        .route(gateway_protocol::ENDPOINT_BARRELS, get(gateway_handlers::handle_get_barrels))
        .route(
            gateway_protocol::ENDPOINT_REGISTER_BARREL,
            post(gateway_handlers::handle_register_barrel),
        )
        .route("/barrels/:id", delete(gateway_handlers::handle_unsubscribe_barrel))
        .layer(Extension(frontier))
        .layer(Extension(service));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Gateway listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_barrel(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting barrel {} on {}", config.barrel_id, config.bind_addr);

    let endpoint = format!("http://{}", config.bind_addr);
    let barrel = Barrel::new(
        config.barrel_id,
        endpoint,
        config.gateway_addr.clone(),
        &config,
    );

    let app = Router::new()
        .route(barrel_protocol::ENDPOINT_STORE, post(barrel_handlers::handle_store))
        .route(barrel_protocol::ENDPOINT_SEARCH, post(barrel_handlers::handle_search))
        .route(barrel_protocol::ENDPOINT_LINKED, post(barrel_handlers::handle_linked))
        .route(barrel_protocol::ENDPOINT_PING, get(barrel_handlers::handle_ping))
        .route(barrel_protocol::ENDPOINT_SNAPSHOT, get(barrel_handlers::handle_snapshot))
        .route(
            barrel_protocol::ENDPOINT_REGISTER_PEER,
            post(barrel_handlers::handle_register_peer),
        )
        .layer(Extension(barrel.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Barrel {} listening on {}", config.barrel_id, config.bind_addr);

    // Register and sync after the server starts accepting, so the gateway
    // and peers can call back in during the join
    let startup = barrel.clone();
    tokio::spawn(async move {
        if let Err(e) = startup.register_with_gateway().await {
            tracing::error!("Gateway registration failed: {}", e);
            std::process::exit(1);
        }
        if let Err(e) = startup.bootstrap().await {
            tracing::warn!("Peer sync failed, continuing with local state: {}", e);
        }
        tracing::info!("Barrel {} fully operational", startup.id);
    });

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_crawler(config: Config) -> anyhow::Result<()> {
    let crawler = Crawler::new(config.gateway_addr.clone(), &config)?;
    crawler.run().await;
    Ok(())
}
