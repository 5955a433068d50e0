//! `simulate` command: drive a full delivery against in-process stores.
//!
//! A simulated deliverer walks the campus route to the restaurant, the
//! order is marked picked up, the deliverer walks on to the customer and
//! the order is marked delivered. A customer subscriber prints every
//! update the remote mirror receives.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use console::style;
use deliverytrack::config::ConfigFile;
use deliverytrack::geo::{distance_km, eta, format_eta, GeoPoint};
use deliverytrack::location::{LocationFix, SimulatedLocationHandle, SimulatedLocationProvider};
use deliverytrack::lookup::StaticCoordinateLookup;
use deliverytrack::route::{builtin_landmarks, LandmarkCatalog, Waypoint};
use deliverytrack::storage::{FileLocalStore, LocalStore, MemoryLocalStore};
use deliverytrack::sync::{Document, DocumentPath, InMemoryRemoteStore};
use deliverytrack::tracking::{RouteStage, TrackingEvent, TrackingSession};
use deliverytrack::TrackingSessionManager;
use tokio::sync::broadcast;

use super::common::{parse_point, resolve_mode, TravelModeArg};
use crate::error::CliError;

const ORDER_ID: &str = "sim-order-1";
const DELIVERER_ID: &str = "sim-deliverer";

/// How long to wait for the manager to react to a remote status change.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Arguments for `deliverytrack simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Deliverer start position as lat,lon
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true, default_value = "36.1405,-86.8075")]
    pub start: GeoPoint,

    /// Restaurant name from the landmark catalog
    #[arg(long, default_value = "Rand Dining Center")]
    pub restaurant: String,

    /// Free-text delivery address
    #[arg(long, default_value = "Branscomb Quad, Room 204")]
    pub address: String,

    /// Metres moved per simulated step
    #[arg(long, default_value_t = 25.0)]
    pub step_m: f64,

    /// Milliseconds between steps
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Milliseconds between full remote pushes
    #[arg(long, default_value_t = 1000)]
    pub sync_ms: u64,

    /// Travel mode for time estimates
    #[arg(long, value_enum)]
    pub mode: Option<TravelModeArg>,

    /// Persist state in the configured storage directory instead of memory
    #[arg(long)]
    pub persist: bool,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    if !args.step_m.is_finite() || args.step_m <= 0.0 {
        return Err(CliError::Input(format!(
            "--step-m must be a positive number, got {}",
            args.step_m
        )));
    }

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(simulate(args, config))
}

async fn simulate(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut tracking = config.tracking.clone();
    tracking.sync_interval = Duration::from_millis(args.sync_ms);
    tracking.travel_mode = resolve_mode(args.mode, config);
    let mode = tracking.travel_mode;
    let tick = Duration::from_millis(args.tick_ms);

    let landmarks: Vec<Waypoint> = match &tracking.route.landmarks_file {
        Some(path) => match LandmarkCatalog::from_file(path).load() {
            Ok(landmarks) => landmarks.to_vec(),
            Err(e) => {
                tracing::warn!(error = %e, "Using built-in landmarks for address lookup");
                builtin_landmarks().to_vec()
            }
        },
        None => builtin_landmarks().to_vec(),
    };
    let lookup = Arc::new(StaticCoordinateLookup::from_landmarks(&landmarks));

    let local: Arc<dyn LocalStore> = if args.persist {
        let store = FileLocalStore::open(&config.storage.directory)
            .map_err(|e| CliError::Tracking(e.into()))?;
        println!(
            "{} {}",
            style("State directory:").bold(),
            store.directory().display()
        );
        Arc::new(store)
    } else {
        Arc::new(MemoryLocalStore::new())
    };

    let remote = Arc::new(InMemoryRemoteStore::new());
    remote.apply_merge(
        &DocumentPath::order(ORDER_ID),
        order_document(&args.restaurant, &args.address, "accepted"),
    );

    let provider = SimulatedLocationProvider::new();
    let device = provider.handle();
    device.move_to(LocationFix::new(args.start));

    let manager = TrackingSessionManager::new(
        tracking,
        Arc::new(provider),
        lookup,
        remote.clone(),
        local,
    );
    let printer = tokio::spawn(print_events(manager.subscribe_events()));

    manager.start_tracking(ORDER_ID, DELIVERER_ID).await?;

    manager.start_customer_tracking(ORDER_ID, move |session: TrackingSession| {
        let arrival = eta(Utc::now(), session.distance_remaining, mode);
        println!(
            "  {} {} {:.3} km to {}, {}",
            style("customer").magenta(),
            style(format!("[{}]", session.route_stage)).dim(),
            session.distance_remaining,
            session.destination(),
            format_eta(arrival)
        );
    });

    // Leg one: to the restaurant.
    let route = current_route(&manager)?;
    walk(&device, &route, args.step_m, tick).await;

    set_status(&remote, &args, "picked_up");
    if !wait_for(STATUS_TIMEOUT, || {
        manager
            .get_current_delivery_tracking()
            .is_some_and(|s| s.route_stage == RouteStage::ToCustomer)
    })
    .await
    {
        return Err(CliError::Input(
            "Tracking did not move to the customer leg".to_string(),
        ));
    }

    // Leg two: to the customer.
    let route = current_route(&manager)?;
    walk(&device, &route, args.step_m, tick).await;

    set_status(&remote, &args, "delivered");
    if !wait_for(STATUS_TIMEOUT, || !manager.is_tracking()).await {
        tracing::warn!("Tracking still active after delivery, stopping");
        manager.stop_tracking();
    }

    // Give the customer subscription a moment to see the final push.
    tokio::time::sleep(Duration::from_millis(200)).await;

    if let Some(last) = manager.get_delivery_tracking(ORDER_ID).await {
        println!();
        println!(
            "{} order {} is {} ({}), {} remote writes",
            style("Done:").green().bold(),
            last.order_id,
            last.status,
            last.route_stage,
            remote.write_count()
        );
    }

    manager.shutdown().await;
    drop(manager);
    // The printer ends once the last manager reference is gone.
    if let Ok(Err(e)) = tokio::time::timeout(Duration::from_secs(1), printer).await {
        tracing::warn!(error = %e, "Event printer ended abnormally");
    }
    Ok(())
}

fn order_document(restaurant: &str, address: &str, status: &str) -> Document {
    let mut doc = Document::new();
    doc.insert("restaurantId".to_string(), restaurant.into());
    doc.insert("deliveryAddress".to_string(), address.into());
    doc.insert("status".to_string(), status.into());
    doc
}

fn set_status(remote: &InMemoryRemoteStore, args: &SimulateArgs, status: &str) {
    println!("{} order status -> {}", style("store").yellow(), status);
    remote.apply_merge(
        &DocumentPath::order(ORDER_ID),
        order_document(&args.restaurant, &args.address, status),
    );
}

/// Points of the active session's route, ending at its destination.
fn current_route(manager: &TrackingSessionManager) -> Result<Vec<GeoPoint>, CliError> {
    let session = manager
        .get_current_delivery_tracking()
        .ok_or_else(|| CliError::Input("Tracking stopped unexpectedly".to_string()))?;

    let mut points: Vec<GeoPoint> = session
        .route
        .as_ref()
        .map(|r| r.waypoints.iter().map(Waypoint::point).collect())
        .unwrap_or_default();
    if points.is_empty() {
        points.push(session.current_location.point());
    }
    points.push(session.destination());

    if let Some(route) = &session.route {
        let names = route.landmark_names();
        if !names.is_empty() {
            println!("{} via {}", style("route").cyan(), names.join(" -> "));
        }
    }
    Ok(points)
}

/// Move the device along `points` in steps of about `step_m` metres.
async fn walk(device: &SimulatedLocationHandle, points: &[GeoPoint], step_m: f64, tick: Duration) {
    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let steps = (distance_km(from, to) * 1000.0 / step_m).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            let point = GeoPoint::new(
                from.latitude + (to.latitude - from.latitude) * t,
                from.longitude + (to.longitude - from.longitude) * t,
            );
            device.move_to(LocationFix::new(point));
            tokio::time::sleep(tick).await;
        }
    }
}

async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

async fn print_events(mut events: broadcast::Receiver<TrackingEvent>) {
    loop {
        match events.recv().await {
            Ok(TrackingEvent::PositionUpdated { .. }) => {}
            Ok(TrackingEvent::Started { order_id, resumed }) => {
                let how = if resumed { "resumed" } else { "started" };
                println!("{} {} tracking {}", style("event").cyan(), how, order_id);
            }
            Ok(TrackingEvent::StageChanged { from, to, .. }) => {
                println!("{} stage {} -> {}", style("event").cyan(), from, to);
            }
            Ok(TrackingEvent::StatusMirrored { status, .. }) => {
                println!("{} status mirrored: {}", style("event").cyan(), status);
            }
            Ok(TrackingEvent::Stopped { order_id, reason }) => {
                println!(
                    "{} stopped tracking {} ({})",
                    style("event").cyan(),
                    order_id,
                    reason
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
