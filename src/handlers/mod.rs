//! NATS message handlers

pub mod ping;
pub mod trip;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::services::routing::{create_directions_service, DirectionsService};

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: Config) -> Result<()> {
    info!("Starting message handlers...");

    let config = Arc::new(config);

    // Route planning needs a provider key; everything else works without one
    let directions: Option<Arc<dyn DirectionsService>> = match create_directions_service(
        config.directions_api_key.as_deref(),
        &config.directions_base_url,
        config.directions_timeout_seconds,
    ) {
        Ok(service) => {
            info!("Directions service initialized: {}", service.name());
            Some(Arc::from(service))
        }
        Err(e) => {
            warn!("Route planning disabled: {}", e);
            None
        }
    };

    // Subscribe to all subjects
    let ping_sub = client.subscribe("trip.ping").await?;
    let get_sub = client.subscribe("trip.get").await?;
    let save_sub = client.subscribe("trip.save").await?;
    let submit_sub = client.subscribe("trip.submit").await?;
    let cancel_sub = client.subscribe("trip.cancel").await?;
    let route_sub = client.subscribe("trip.route.process").await?;
    let timesheet_sub = client.subscribe("trip.timesheet").await?;
    let payment_sub = client.subscribe("trip.payment").await?;
    let notes_sub = client.subscribe("trip.delivery_notes.validate").await?;
    let window_sub = client.subscribe("trip.delivery_window.get").await?;

    info!("Subscribed to NATS subjects");

    let client_ping = client.clone();
    let client_get = client.clone();
    let client_save = client.clone();
    let client_submit = client.clone();
    let client_cancel = client.clone();
    let client_route = client.clone();
    let client_timesheet = client.clone();
    let client_payment = client.clone();
    let client_notes = client.clone();
    let client_window = client.clone();

    let pool_get = pool.clone();
    let pool_save = pool.clone();
    let pool_submit = pool.clone();
    let pool_cancel = pool.clone();
    let pool_route = pool.clone();
    let pool_timesheet = pool.clone();
    let pool_payment = pool.clone();
    let pool_notes = pool.clone();
    let pool_window = pool.clone();

    let config_save = Arc::clone(&config);
    let config_submit = Arc::clone(&config);
    let config_route = Arc::clone(&config);
    let config_timesheet = Arc::clone(&config);
    let config_window = Arc::clone(&config);

    let has_directions = directions.is_some();

    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub, has_directions).await
    });

    let get_handle = tokio::spawn(async move {
        trip::handle_get(client_get, get_sub, pool_get).await
    });

    let save_handle = tokio::spawn(async move {
        trip::handle_save(client_save, save_sub, pool_save, config_save).await
    });

    let submit_handle = tokio::spawn(async move {
        trip::handle_submit(client_submit, submit_sub, pool_submit, config_submit).await
    });

    let cancel_handle = tokio::spawn(async move {
        trip::handle_cancel(client_cancel, cancel_sub, pool_cancel).await
    });

    let route_handle = tokio::spawn(async move {
        trip::handle_process_route(client_route, route_sub, pool_route, config_route, directions).await
    });

    let timesheet_handle = tokio::spawn(async move {
        trip::handle_timesheet(client_timesheet, timesheet_sub, pool_timesheet, config_timesheet).await
    });

    let payment_handle = tokio::spawn(async move {
        trip::handle_payment(client_payment, payment_sub, pool_payment).await
    });

    let notes_handle = tokio::spawn(async move {
        trip::handle_validate_delivery_notes(client_notes, notes_sub, pool_notes).await
    });

    let window_handle = tokio::spawn(async move {
        trip::handle_delivery_window(client_window, window_sub, pool_window, config_window).await
    });

    info!("All handlers started");

    // Wait for any handler to finish (which would indicate an error)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = get_handle => {
            error!("Trip get handler finished: {:?}", result);
        }
        result = save_handle => {
            error!("Trip save handler finished: {:?}", result);
        }
        result = submit_handle => {
            error!("Trip submit handler finished: {:?}", result);
        }
        result = cancel_handle => {
            error!("Trip cancel handler finished: {:?}", result);
        }
        result = route_handle => {
            error!("Route process handler finished: {:?}", result);
        }
        result = timesheet_handle => {
            error!("Timesheet handler finished: {:?}", result);
        }
        result = payment_handle => {
            error!("Payment handler finished: {:?}", result);
        }
        result = notes_handle => {
            error!("Delivery note validation handler finished: {:?}", result);
        }
        result = window_handle => {
            error!("Delivery window handler finished: {:?}", result);
        }
    }

    Ok(())
}
