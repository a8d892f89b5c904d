//! Delivery trip message handlers
//!
//! Every write runs in one transaction that first takes the trip's row lock,
//! so concurrent saves of the same trip are serialized.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use chrono::{Duration, Local};
use futures::StreamExt;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::queries;
use crate::defaults::PROVIDER_DISTANCE_UNIT;
use crate::error::{PlanningError, TripError};
use crate::services::arrival::EstimateSettings;
use crate::services::delivery_window::resolve_delivery_window;
use crate::services::planner::{apply_plan, plan_route};
use crate::services::routing::DirectionsService;
use crate::services::status::{self, LinkedRecords};
use crate::services::timesheet::{apply_driver_action, ActionContext};
use crate::services::units::resolve_conversion_factor;
use crate::types::{
    DeliveryWindow, DeliveryWindowRequest, DocStatus, DriverAction, ErrorResponse, ProcessRouteRequest,
    ProcessRouteResponse, Request, StopPaymentRequest, StopPaymentResponse, SuccessResponse,
    TimesheetActionRequest, Trip, TripIdRequest, TripStatus, ValidateDeliveryNotesRequest,
    ValidateDeliveryNotesResponse,
};

type TripResult<T> = std::result::Result<T, TripError>;

fn not_found(trip_id: Uuid) -> TripError {
    PlanningError::NotFound(trip_id.to_string()).into()
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for value in values.flatten() {
        if seen.insert(value.as_str()) {
            out.push(value.clone());
        }
    }
    out
}

async fn load_linked_records(conn: &mut PgConnection, trip: &Trip) -> Result<LinkedRecords> {
    let addresses = distinct(
        trip.delivery_stops
            .iter()
            .filter(|s| s.customer_address.as_deref().map_or(true, |a| a.trim().is_empty()))
            .map(|s| s.address.as_ref()),
    );
    let notes: Vec<String> = trip.delivery_notes().into_iter().map(str::to_string).collect();

    Ok(LinkedRecords {
        address_displays: queries::customer::address_displays(conn, &addresses).await?,
        note_invoices: queries::delivery_note::note_invoices(conn, &notes).await?,
    })
}

/// Write the linked-document effects of a submitted trip
async fn apply_after_submit(conn: &mut PgConnection, trip: &Trip) -> Result<()> {
    let invoices = distinct(trip.delivery_stops.iter().map(|s| s.sales_invoice.as_ref()));
    let statuses = queries::delivery_note::invoice_statuses(conn, &invoices).await?;

    let effects = status::after_submit_effects(
        trip,
        |invoice| statuses.get(invoice).copied(),
        Local::now().date_naive(),
    );
    debug!(
        "Trip {} after-submit: {} note changes, {} due dates",
        trip.name,
        effects.note_changes.len(),
        effects.due_dates.len()
    );

    queries::delivery_note::apply_status_changes(conn, &effects.note_changes).await?;
    queries::delivery_note::push_due_dates(conn, &effects.due_dates).await?;
    if let Some((vehicle, odometer)) = effects.vehicle_odometer.as_ref() {
        queries::vehicle::set_last_odometer(conn, vehicle, *odometer).await?;
    }

    Ok(())
}

/// Save-time validation, upsert and, for submitted trips, linked-document effects
async fn validate_and_store(conn: &mut PgConnection, config: &Config, trip: &mut Trip) -> Result<()> {
    let linked = load_linked_records(conn, trip).await?;
    status::validate(trip, &linked, config.map_embed_key());

    queries::trip::save_trip(conn, trip).await?;
    if trip.is_submitted() {
        apply_after_submit(conn, trip).await?;
    }
    Ok(())
}

fn reject_cancelled(trip: &Trip, action: &str) -> TripResult<()> {
    if trip.docstatus == DocStatus::Cancelled {
        return Err(PlanningError::InvalidTransition {
            action: action.to_string(),
            state: trip.docstatus.as_str().to_string(),
        }
        .into());
    }
    Ok(())
}

// ==========================================================================
// Operations
// ==========================================================================

async fn save_trip(pool: &PgPool, config: &Config, mut trip: Trip) -> TripResult<Trip> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    match queries::trip::lock_trip(&mut tx, trip.id).await? {
        Some(existing) => {
            reject_cancelled(&existing, "save")?;
            // Lifecycle and driver state only change through their own subjects
            trip.docstatus = existing.docstatus;
            trip.status = existing.status;
        }
        None => {
            trip.docstatus = DocStatus::Draft;
            trip.status = TripStatus::Draft;
        }
    }

    trip.renumber_stops();
    validate_and_store(&mut tx, config, &mut trip).await?;

    tx.commit().await.context("failed to commit trip save")?;
    Ok(trip)
}

async fn submit_trip(pool: &PgPool, config: &Config, trip_id: Uuid) -> TripResult<Trip> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut trip = queries::trip::lock_trip(&mut tx, trip_id).await?.ok_or_else(|| not_found(trip_id))?;

    let linked = load_linked_records(&mut tx, &trip).await?;
    status::validate(&mut trip, &linked, config.map_embed_key());
    let updates = status::submit(&mut trip)?;

    queries::trip::save_trip(&mut tx, &trip).await?;
    queries::delivery_note::apply_note_updates(&mut tx, &updates).await?;

    tx.commit().await.context("failed to commit trip submit")?;
    info!("Trip {} submitted, {} delivery notes updated", trip.name, updates.len());
    Ok(trip)
}

async fn cancel_trip(pool: &PgPool, trip_id: Uuid) -> TripResult<Trip> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut trip = queries::trip::lock_trip(&mut tx, trip_id).await?.ok_or_else(|| not_found(trip_id))?;

    let updates = status::cancel(&mut trip)?;

    queries::trip::save_trip(&mut tx, &trip).await?;
    queries::delivery_note::apply_note_updates(&mut tx, &updates).await?;

    tx.commit().await.context("failed to commit trip cancel")?;
    info!("Trip {} cancelled, {} delivery notes reset", trip.name, updates.len());
    Ok(trip)
}

async fn process_route(
    pool: &PgPool,
    config: &Config,
    directions: Option<&dyn DirectionsService>,
    request: &ProcessRouteRequest,
) -> TripResult<ProcessRouteResponse> {
    let directions = directions.ok_or(PlanningError::MissingApiKey)?;

    let trip = queries::trip::get_trip(pool, request.trip_id)
        .await?
        .ok_or_else(|| not_found(request.trip_id))?;
    reject_cancelled(&trip, "process route")?;

    let unit = &config.delivery.default_distance_unit;
    let stored = queries::settings::get_conversion_factor(pool, PROVIDER_DISTANCE_UNIT, unit).await?;
    let settings = EstimateSettings {
        stop_delay: Duration::minutes(config.delivery.stop_delay_minutes),
        conversion_factor: resolve_conversion_factor(stored, PROVIDER_DISTANCE_UNIT, unit)?,
        distance_unit: unit.clone(),
    };

    let optimize = request.optimize.unwrap_or(config.delivery.optimize_default);
    let plan = plan_route(&trip, optimize, directions, &settings).await?;

    // The provider calls run without a lock; merge onto the row as it is now
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut current = queries::trip::lock_trip(&mut tx, trip.id)
        .await?
        .ok_or_else(|| not_found(trip.id))?;
    reject_cancelled(&current, "process route")?;

    apply_plan(&mut current, &plan.trip);
    validate_and_store(&mut tx, config, &mut current).await?;
    tx.commit().await.context("failed to commit planned route")?;

    if !plan.failed_legs.is_empty() {
        warn!("Trip {}: {} legs could not be routed", current.name, plan.failed_legs.len());
    }

    Ok(ProcessRouteResponse {
        trip: current,
        failed_legs: plan.failed_legs,
    })
}

async fn driver_action(pool: &PgPool, config: &Config, request: &TimesheetActionRequest) -> TripResult<Trip> {
    let action = DriverAction::from_str(&request.action)
        .ok_or_else(|| PlanningError::UnknownAction(request.action.clone()))?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut trip = queries::trip::lock_trip(&mut tx, request.trip_id)
        .await?
        .ok_or_else(|| not_found(request.trip_id))?;

    let (timesheet, employee) = match action {
        DriverAction::Start => {
            let employee = match trip.driver.as_deref() {
                Some(driver) => queries::timesheet::driver_employee(&mut tx, driver).await?,
                None => None,
            };
            (None, employee)
        }
        _ => (queries::timesheet::get_open_timesheet(&mut tx, trip.id).await?, None),
    };

    let ctx = ActionContext {
        now: Local::now().naive_local(),
        odometer_value: request.odometer_value,
        employee,
        activity_type: config.delivery.default_activity_type.as_deref(),
    };
    let timesheet = apply_driver_action(&mut trip, timesheet, action, &ctx)?;

    if let Some(timesheet) = timesheet.as_ref() {
        queries::timesheet::save_timesheet(&mut tx, timesheet).await?;
    }
    queries::trip::save_trip(&mut tx, &trip).await?;
    apply_after_submit(&mut tx, &trip).await?;

    tx.commit().await.context("failed to commit driver action")?;
    info!("Trip {}: driver action {} -> {}", trip.name, action.as_str(), trip.status);
    Ok(trip)
}

async fn record_payment(pool: &PgPool, request: &StopPaymentRequest) -> TripResult<StopPaymentResponse> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let trip_ids = queries::trip::submitted_trips_for_invoice(&mut tx, &request.sales_invoice).await?;

    let mut updated_trips = Vec::with_capacity(trip_ids.len());
    for trip_id in trip_ids {
        let Some(mut trip) = queries::trip::lock_trip(&mut tx, trip_id).await? else {
            continue;
        };

        let changes = status::record_stop_payment(&mut trip, &request.sales_invoice, request.payment_amount);
        queries::trip::save_trip(&mut tx, &trip).await?;
        queries::delivery_note::apply_status_changes(&mut tx, &changes).await?;
        updated_trips.push(trip.name);
    }

    tx.commit().await.context("failed to commit stop payment")?;
    Ok(StopPaymentResponse { updated_trips })
}

async fn delivery_window(pool: &PgPool, config: &Config, request: &DeliveryWindowRequest) -> TripResult<DeliveryWindow> {
    let document = match request.document.as_ref() {
        Some(doc) => queries::customer::get_document_delivery_window(pool, doc.doctype, &doc.name).await?,
        None => None,
    };
    let customer = match request.customer.as_deref() {
        Some(customer) => queries::customer::get_delivery_window(pool, customer).await?,
        None => None,
    };

    Ok(resolve_delivery_window(document, customer, &config.delivery))
}

// ==========================================================================
// Subscribers
// ==========================================================================

/// Handle trip.get messages
pub async fn handle_get(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<TripIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let trip_id = request.payload.trip_id;
        match queries::trip::get_trip(&pool, trip_id).await {
            Ok(Some(trip)) => {
                let response = SuccessResponse::new(request.id, trip);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Ok(None) => {
                let error = ErrorResponse::from_planning(request.id, &PlanningError::NotFound(trip_id.to_string()));
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
            Err(e) => {
                error!("Failed to get trip: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.save messages
pub async fn handle_save(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    config: Arc<Config>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.save message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<Trip> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match save_trip(&pool, &config, request.payload).await {
            Ok(trip) => {
                let response = SuccessResponse::new(request.id, trip);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to save trip: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.submit messages
pub async fn handle_submit(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    config: Arc<Config>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.submit message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<TripIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match submit_trip(&pool, &config, request.payload.trip_id).await {
            Ok(trip) => {
                let response = SuccessResponse::new(request.id, trip);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to submit trip: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.cancel messages
pub async fn handle_cancel(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.cancel message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<TripIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match cancel_trip(&pool, request.payload.trip_id).await {
            Ok(trip) => {
                let response = SuccessResponse::new(request.id, trip);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to cancel trip: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.route.process messages
///
/// Plans the route through the directions provider and stores the estimates.
pub async fn handle_process_route(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    config: Arc<Config>,
    directions: Option<Arc<dyn DirectionsService>>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.route.process message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ProcessRouteRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match process_route(&pool, &config, directions.as_deref(), &request.payload).await {
            Ok(result) => {
                info!(
                    "Route processed for trip {}: total {:?} {}",
                    result.trip.name,
                    result.trip.total_distance,
                    result.trip.uom.as_deref().unwrap_or("")
                );
                let response = SuccessResponse::new(request.id, result);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to process route: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.timesheet messages (driver start / pause / continue / end)
pub async fn handle_timesheet(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    config: Arc<Config>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.timesheet message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<TimesheetActionRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match driver_action(&pool, &config, &request.payload).await {
            Ok(trip) => {
                let response = SuccessResponse::new(request.id, trip);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to apply driver action: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.payment messages
pub async fn handle_payment(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.payment message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<StopPaymentRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match record_payment(&pool, &request.payload).await {
            Ok(result) => {
                let response = SuccessResponse::new(request.id, result);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to record stop payment: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.delivery_notes.validate messages
pub async fn handle_validate_delivery_notes(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.delivery_notes.validate message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ValidateDeliveryNotesRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        let notes = status::referenced_delivery_notes(&request.payload.delivery_stops);
        match queries::trip::find_trips_for_delivery_notes(&pool, &notes).await {
            Ok(existing_trips) => {
                let response = SuccessResponse::new(request.id, ValidateDeliveryNotesResponse { existing_trips });
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to look up delivery notes: {}", e);
                let error = ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle trip.delivery_window.get messages
pub async fn handle_delivery_window(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    config: Arc<Config>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received trip.delivery_window.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<DeliveryWindowRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match delivery_window(&pool, &config, &request.payload).await {
            Ok(window) => {
                let response = SuccessResponse::new(request.id, window);
                let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
            }
            Err(e) => {
                error!("Failed to get delivery window: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
