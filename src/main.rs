use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file path as the only argument
    let cfg = match std::env::args().nth(1) {
        Some(path) => config::Config::load_from(&path)?,
        None => config::Config::load()?,
    };
    logger::init(&cfg)?;

    // Tokio runtime, sized by the workers setting when present
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    let settings = Arc::new(server::ConnectionSettings {
        serve: handler::ServeContext::from_config(&cfg.http),
        max_connections: cfg.performance.max_connections,
        access_log: cfg.logging.access_log,
        access_log_format: cfg.logging.access_log_format.clone(),
    });
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &cfg);

    server::start_server_loop(
        listener,
        Arc::clone(&active_connections),
        server::ServerLoopConfig {
            settings,
            shutdown: Arc::clone(&signals.shutdown),
        },
    )
    .await?;

    // Spawned connection tasks die with the runtime, so let them finish first
    let remaining =
        server::drain_connections(&active_connections, cfg.performance.drain_deadline()).await;
    logger::log_server_drained(remaining);

    if signals.is_shutdown_requested() {
        logger::log_info("Shutdown complete");
    }
    Ok(())
}
