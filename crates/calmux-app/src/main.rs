use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use calmux_app::app::api::routes;
use calmux_app::config::SettingsHandler;
use calmux_app::directory::FileDirectory;
use calmux_app::state::{AppServices, ServicesHandler};
use calmux_core::config::load_config;
use calmux_service::{
    AccessGate, BookingClient, BookingLookup, CalendarFetcher, MergeStreamer, SourceResolver,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Calmux calendar aggregation server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let directory = FileDirectory::load(&config.directory)?;

    tracing::info!("Directory loaded");

    let booking: Option<Arc<dyn BookingLookup>> = match &config.booking {
        Some(booking_config) => {
            let client: Arc<dyn BookingLookup> = Arc::new(BookingClient::new(booking_config)?);
            Some(client)
        }
        None => {
            tracing::info!("Booking service not configured, booking feeds will answer 404");
            None
        }
    };

    let fetcher = Arc::new(CalendarFetcher::new(&config.feeds)?);
    let services = Arc::new(AppServices {
        resolver: SourceResolver::new(directory.clone(), directory.clone(), booking),
        streamer: MergeStreamer::new(fetcher, &config.feeds, &config.calendar),
        gate: AccessGate::new(directory.clone()),
        verifier: directory.clone(),
        directory: directory.clone(),
        catalog: directory,
    });

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(SettingsHandler {
            settings: config.clone(),
        })
        .hoop(ServicesHandler { services })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
