//! Tracking session manager.
//!
//! Owns the single active [`TrackingSession`] and the three tasks that keep
//! it alive:
//!
//! ```text
//!                    ┌──────────────────────────┐
//!  LocationProvider ─┤ location task            ├─► session + samples ─► local store
//!   (watch stream)   └──────────────────────────┘         │
//!                                                         ▼ outbound queue
//!                    ┌──────────────────────────┐
//!  interval (10 s) ──┤ sync task                ├─► RemoteSyncBridge ─► delivery_tracking/{id}
//!                    └──────────────────────────┘
//!                    ┌──────────────────────────┐
//!  orders/{id} ──────┤ status task              ├─► status, stage machine, completion
//!                    └──────────────────────────┘
//! ```
//!
//! All three share one cancellation token. Every task carries the
//! generation number of the session it was spawned for and drops its work
//! if the active session has a different generation, so a stopped session
//! is never written again.
//!
//! Session state sits behind a `parking_lot` mutex that is never held across
//! an `.await`. Remote failures are logged and swallowed; only the errors in
//! [`TrackingError`] reach callers.
//!
//! Local persistence runs synchronously under that mutex, once per fix. The
//! writes are a single small JSON value per key, and holding the lock orders
//! them against the clear in `stop`, so a stopped session is never written
//! back. A slow [`LocalStore`] therefore stalls the worker thread that
//! delivers the fix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::error::TrackingError;
use super::events::{StopReason, TrackingEvent, EVENT_CHANNEL_CAPACITY};
use super::order::OrderStatus;
use super::persisted::PersistedTracking;
use super::samples::{LocationSample, LocationSampleStore};
use super::session::{NamedLocation, PositionUpdate, TrackingSession};
use super::stage::{RouteStage, RouteStageMachine, StageUpdate};
use super::subscriber::CustomerTrackingSubscriber;
use crate::config::TrackingConfig;
use crate::geo::GeoPoint;
use crate::location::{LocationFix, LocationProvider};
use crate::lookup::CoordinateLookup;
use crate::route::RouteApproximator;
use crate::storage::LocalStore;
use crate::sync::{best_effort, RemoteStore, RemoteSyncBridge};

/// Maximum delay between status listener resubscriptions.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Lower bound for the full-push interval.
const MIN_SYNC_INTERVAL: Duration = Duration::from_millis(100);

/// Pending writes held for the sync task while the remote is slow.
const OUTBOUND_CAPACITY: usize = 32;

/// Writes queued for the sync task.
enum OutboundWrite {
    Session(Box<TrackingSession>),
    Position(PositionUpdate),
}

/// Cancellation and task handles of one session.
struct SessionHandles {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

struct ActiveSession {
    generation: u64,
    session: TrackingSession,
    stages: RouteStageMachine,
    samples: LocationSampleStore,
    outbound: mpsc::Sender<OutboundWrite>,
    handles: SessionHandles,
}

/// Queue a write without blocking. A full queue drops the write; the next
/// periodic push carries the latest session anyway.
fn queue_write(outbound: &mpsc::Sender<OutboundWrite>, write: OutboundWrite) -> bool {
    match outbound.try_send(write) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!("Outbound queue full, dropping remote write");
            false
        }
        // The sync task is already gone.
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

impl ActiveSession {
    fn queue(&self, write: OutboundWrite) {
        queue_write(&self.outbound, write);
    }
}

struct Shared {
    config: TrackingConfig,
    location: Arc<dyn LocationProvider>,
    lookup: Arc<dyn CoordinateLookup>,
    bridge: RemoteSyncBridge,
    persisted: PersistedTracking,
    router: RouteApproximator,
    customer: CustomerTrackingSubscriber,
    active: Mutex<Option<ActiveSession>>,
    next_generation: AtomicU64,
    events: broadcast::Sender<TrackingEvent>,
}

/// Lifecycle owner of the active delivery tracking session.
///
/// Cheap to clone; clones share the same session.
///
/// # Example
///
/// ```ignore
/// let manager = TrackingSessionManager::new(config, location, lookup, remote, local);
/// let mut events = manager.subscribe_events();
///
/// manager.start_tracking("order-1", "deliverer-1").await?;
/// manager.update_route_stage("order-1", RouteStage::ToCustomer);
/// manager.stop_tracking();
/// ```
#[derive(Clone)]
pub struct TrackingSessionManager {
    shared: Arc<Shared>,
}

impl TrackingSessionManager {
    pub fn new(
        config: TrackingConfig,
        location: Arc<dyn LocationProvider>,
        lookup: Arc<dyn CoordinateLookup>,
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        let bridge = RemoteSyncBridge::new(remote);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                router: RouteApproximator::new(config.route.clone()),
                customer: CustomerTrackingSubscriber::new(bridge.clone()),
                persisted: PersistedTracking::new(local),
                config,
                location,
                lookup,
                bridge,
                active: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Start tracking a delivery, replacing any active session.
    ///
    /// Checks location permission, takes an initial fix, reads the order and
    /// resolves its coordinates, computes the first route and persists the
    /// session before attaching the location, sync and status tasks.
    pub async fn start_tracking(&self, order_id: &str, deliverer_id: &str) -> Result<(), TrackingError> {
        let shared = &self.shared;
        tracing::info!(order_id, deliverer_id, "Starting delivery tracking");

        shared.stop(None, StopReason::Replaced);

        shared.location.ensure_permission().await?;
        let fix = shared.location.current_fix().await?;

        let order = match shared.bridge.fetch_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                return Err(TrackingError::OrderUnavailable {
                    order_id: order_id.to_string(),
                    reason: "order not found".to_string(),
                })
            }
            Err(e) => {
                return Err(TrackingError::OrderUnavailable {
                    order_id: order_id.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        if order.status.is_closed() {
            return Err(TrackingError::OrderClosed {
                order_id: order_id.to_string(),
                status: order.status.to_string(),
            });
        }

        let restaurant = self.resolve_restaurant(&order.restaurant_id).await?;
        let customer = self.resolve_address(&order.delivery_address).await?;

        let mut session = TrackingSession::new(
            order_id,
            deliverer_id,
            order.status,
            NamedLocation::new(restaurant, order.restaurant_id.as_str()),
            NamedLocation::new(customer, order.delivery_address.as_str()),
            &fix,
            shared.config.travel_mode,
        );
        session.set_route(shared.router.campus_route(fix.point(), session.destination()));

        let mut samples = LocationSampleStore::with_capacity(shared.config.sample_capacity);
        samples.push(LocationSample::from_fix(&fix, order_id));
        let stages = RouteStageMachine::resume(session.route_stage);

        shared.persisted.save_session(&session)?;
        shared.persisted.save_samples(&samples.to_vec())?;
        shared.persisted.set_enabled(true)?;

        if let Err(e) = self.attach(session, stages, samples, false) {
            if let Err(clear) = shared.persisted.clear() {
                tracing::warn!(error = %clear, "Failed to clear persisted tracking state");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Stop the active session and clear the persisted state.
    ///
    /// Idempotent. Returns whether a session was running.
    pub fn stop_tracking(&self) -> bool {
        self.shared.stop(None, StopReason::Requested)
    }

    /// Re-attach a persisted session after a restart.
    ///
    /// Returns `Ok(false)` when tracking was not enabled or nothing usable
    /// was persisted. No new fix is taken; the next watcher fix refreshes
    /// the position.
    pub async fn resume(&self) -> Result<bool, TrackingError> {
        let shared = &self.shared;
        let already_active = shared.active.lock().is_some();
        if already_active {
            return Ok(true);
        }
        if !shared.persisted.is_enabled()? {
            return Ok(false);
        }

        let Some(session) = shared.persisted.load_session()? else {
            shared.persisted.clear()?;
            return Ok(false);
        };
        if session.route_stage == RouteStage::Completed || session.status.is_closed() {
            tracing::info!(order_id = %session.order_id, "Persisted delivery already finished");
            shared.persisted.clear()?;
            return Ok(false);
        }

        let samples = LocationSampleStore::from_samples(
            shared.persisted.load_samples()?,
            shared.config.sample_capacity,
        );
        let stages = RouteStageMachine::resume(session.route_stage);
        tracing::info!(order_id = %session.order_id, samples = samples.len(), "Resuming delivery tracking");

        self.attach(session, stages, samples, true)?;
        Ok(true)
    }

    /// The active session, or the persisted one if tracking is enabled.
    pub fn get_current_delivery_tracking(&self) -> Option<TrackingSession> {
        if let Some(active) = self.shared.active.lock().as_ref() {
            return Some(active.session.clone());
        }

        let persisted = &self.shared.persisted;
        match persisted.is_enabled().and_then(|enabled| {
            if enabled {
                persisted.load_session()
            } else {
                Ok(None)
            }
        }) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted tracking state");
                None
            }
        }
    }

    /// Tracking state for `order_id`: local first, then the remote mirror.
    pub async fn get_delivery_tracking(&self, order_id: &str) -> Option<TrackingSession> {
        if let Some(session) = self
            .get_current_delivery_tracking()
            .filter(|s| s.order_id == order_id)
        {
            return Some(session);
        }

        best_effort(
            "fetch_session",
            order_id,
            self.shared.bridge.fetch_session(order_id).await,
        )
        .flatten()
    }

    /// Explicitly move the active session's route stage forward.
    ///
    /// Returns false when no session for `order_id` is active or the move
    /// would go backwards. Moving to `Completed` finishes the session.
    pub fn update_route_stage(&self, order_id: &str, stage: RouteStage) -> bool {
        let shared = &self.shared;
        let mut guard = shared.active.lock();
        let Some(active) = guard.as_mut().filter(|a| a.session.order_id == order_id) else {
            tracing::warn!(order_id, stage = %stage, "No active session for route stage change");
            return false;
        };

        let update = match active.stages.advance(stage) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Rejected route stage change");
                return false;
            }
        };
        let Some(event) = shared.apply_stage_update(active, update) else {
            return true;
        };

        shared.persist_session(active);
        let generation = active.generation;
        let snapshot = active.session.clone();
        if !update.completed {
            active.queue(OutboundWrite::Session(Box::new(snapshot.clone())));
        }
        drop(guard);

        shared.emit(event);
        if update.completed {
            shared.finish(generation, snapshot, StopReason::Delivered);
        }
        true
    }

    /// Watch a delivery as a customer. Replaces any previous subscription.
    pub fn start_customer_tracking<F>(&self, order_id: &str, on_update: F) -> bool
    where
        F: FnMut(TrackingSession) + Send + 'static,
    {
        best_effort(
            "subscribe_session",
            order_id,
            self.shared.customer.subscribe(order_id, on_update),
        )
        .is_some()
    }

    pub fn stop_customer_tracking(&self) {
        self.shared.customer.unsubscribe();
    }

    pub fn is_customer_tracking(&self) -> bool {
        self.shared.customer.is_active()
    }

    /// Whether a session is active.
    pub fn is_tracking(&self) -> bool {
        self.shared.active.lock().is_some()
    }

    /// Receive lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackingEvent> {
        self.shared.events.subscribe()
    }

    /// Detach all tasks and wait for them, keeping the persisted state so a
    /// later [`resume`](Self::resume) can pick the session up again.
    pub async fn shutdown(&self) {
        self.shared.customer.unsubscribe();
        let taken = self.shared.active.lock().take();
        let Some(active) = taken else {
            return;
        };

        let order_id = active.session.order_id.clone();
        active.handles.cancel.cancel();
        for task in active.handles.tasks {
            if let Err(e) = task.await {
                tracing::warn!(order_id = %order_id, error = %e, "Tracking task ended abnormally");
            }
        }
        tracing::info!(order_id = %order_id, "Tracking detached, state kept for resume");
    }

    async fn resolve_restaurant(&self, restaurant_id: &str) -> Result<GeoPoint, TrackingError> {
        match self.shared.lookup.restaurant(restaurant_id).await {
            Ok(Some(point)) => Ok(point),
            Ok(None) => Err(TrackingError::CoordinateResolution {
                what: format!("restaurant '{}'", restaurant_id),
                reason: "unknown restaurant".to_string(),
            }),
            Err(e) => Err(TrackingError::CoordinateResolution {
                what: format!("restaurant '{}'", restaurant_id),
                reason: e.to_string(),
            }),
        }
    }

    async fn resolve_address(&self, address: &str) -> Result<GeoPoint, TrackingError> {
        match self.shared.lookup.address(address).await {
            Ok(Some(point)) => Ok(point),
            Ok(None) => Err(TrackingError::CoordinateResolution {
                what: format!("address '{}'", address),
                reason: "address not recognised".to_string(),
            }),
            Err(e) => Err(TrackingError::CoordinateResolution {
                what: format!("address '{}'", address),
                reason: e.to_string(),
            }),
        }
    }

    /// Install `session` as the active session and spawn its tasks.
    fn attach(
        &self,
        session: TrackingSession,
        stages: RouteStageMachine,
        samples: LocationSampleStore,
        resumed: bool,
    ) -> Result<(), TrackingError> {
        let shared = &self.shared;
        let fixes = shared.location.watch(shared.config.watch)?;

        let generation = shared.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let order_id = session.order_id.clone();

        // Tasks block on the lock until the session is installed.
        let replaced = {
            let mut guard = shared.active.lock();
            let tasks = vec![
                tokio::spawn(run_location_task(
                    Arc::clone(shared),
                    generation,
                    fixes,
                    cancel.clone(),
                )),
                tokio::spawn(run_sync_task(
                    Arc::clone(shared),
                    generation,
                    outbound_rx,
                    cancel.clone(),
                )),
                tokio::spawn(run_status_task(
                    Arc::clone(shared),
                    generation,
                    order_id.clone(),
                    cancel.clone(),
                )),
            ];
            guard.replace(ActiveSession {
                generation,
                session,
                stages,
                samples,
                outbound,
                handles: SessionHandles { cancel, tasks },
            })
        };

        if let Some(old) = replaced {
            old.handles.cancel.cancel();
            shared.emit(TrackingEvent::Stopped {
                order_id: old.session.order_id,
                reason: StopReason::Replaced,
            });
        }

        tracing::info!(order_id = %order_id, generation, resumed, "Delivery tracking active");
        shared.emit(TrackingEvent::Started { order_id, resumed });
        Ok(())
    }
}

impl Shared {
    fn emit(&self, event: TrackingEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn snapshot(&self, generation: u64) -> Option<TrackingSession> {
        self.active
            .lock()
            .as_ref()
            .filter(|a| a.generation == generation)
            .map(|a| a.session.clone())
    }

    fn persist_session(&self, active: &ActiveSession) {
        if let Err(e) = self.persisted.save_session(&active.session) {
            tracing::warn!(order_id = %active.session.order_id, error = %e, "Failed to persist session");
        }
    }

    /// Tear down the active session.
    ///
    /// With `generation` set, only that session is stopped. Without it the
    /// persisted state is cleared even when nothing is active.
    fn stop(&self, generation: Option<u64>, reason: StopReason) -> bool {
        let stopped = {
            let mut guard = self.active.lock();
            if let Some(generation) = generation {
                if guard.as_ref().map(|a| a.generation) != Some(generation) {
                    return false;
                }
            }
            let taken = guard.take();
            if let Err(e) = self.persisted.clear() {
                tracing::warn!(error = %e, "Failed to clear persisted tracking state");
            }
            taken
        };

        let Some(active) = stopped else {
            return false;
        };
        active.handles.cancel.cancel();

        let order_id = active.session.order_id;
        tracing::info!(order_id = %order_id, reason = %reason, "Delivery tracking stopped");
        self.emit(TrackingEvent::Stopped { order_id, reason });
        true
    }

    /// Push the final state once more, then stop.
    fn finish(&self, generation: u64, snapshot: TrackingSession, reason: StopReason) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let bridge = self.bridge.clone();
                runtime.spawn(async move {
                    best_effort(
                        "final_push",
                        &snapshot.order_id,
                        bridge.push_session(&snapshot).await,
                    );
                });
            }
            Err(_) => {
                tracing::warn!(order_id = %snapshot.order_id, "No runtime for final push, skipping");
            }
        }
        self.stop(Some(generation), reason);
    }

    fn handle_fix(&self, generation: u64, fix: LocationFix) {
        let mut guard = self.active.lock();
        let Some(active) = guard.as_mut().filter(|a| a.generation == generation) else {
            tracing::debug!(generation, "Dropping fix for inactive session");
            return;
        };

        active.session.apply_position(&fix, self.config.travel_mode);
        active
            .samples
            .push(LocationSample::from_fix(&fix, &active.session.order_id));

        // Under the lock so a concurrent stop cannot be overwritten.
        let persisted = self
            .persisted
            .save_session(&active.session)
            .and_then(|_| self.persisted.save_samples(&active.samples.to_vec()));
        if let Err(e) = persisted {
            tracing::warn!(order_id = %active.session.order_id, error = %e, "Failed to persist location sample");
        }

        active.queue(OutboundWrite::Position(active.session.position_update()));

        let session = &active.session;
        tracing::debug!(
            order_id = %session.order_id,
            distance_km = session.distance_remaining,
            eta_min = session.estimated_time_remaining,
            "Location sample processed"
        );
        let event = TrackingEvent::PositionUpdated {
            order_id: session.order_id.clone(),
            distance_remaining: session.distance_remaining,
            estimated_time_remaining: session.estimated_time_remaining,
        };
        drop(guard);
        self.emit(event);
    }

    /// Mirror a remote order status. Returns false once the status task
    /// should exit.
    fn apply_remote_status(&self, generation: u64, status: OrderStatus) -> bool {
        let mut guard = self.active.lock();
        let Some(active) = guard.as_mut().filter(|a| a.generation == generation) else {
            return false;
        };
        if active.session.status == status {
            return true;
        }

        let order_id = active.session.order_id.clone();
        tracing::info!(order_id = %order_id, status = %status, "Order status changed");
        active.session.status = status;
        active.session.touch(Utc::now());
        let mut events = vec![TrackingEvent::StatusMirrored {
            order_id: order_id.clone(),
            status,
        }];

        if status == OrderStatus::Cancelled {
            let snapshot = active.session.clone();
            drop(guard);
            events.into_iter().for_each(|e| self.emit(e));
            self.finish(generation, snapshot, StopReason::Cancelled);
            return false;
        }

        let update = active.stages.apply_status(status);
        events.extend(self.apply_stage_update(active, update));
        self.persist_session(active);

        let snapshot = active.session.clone();
        if !update.completed {
            active.queue(OutboundWrite::Session(Box::new(snapshot.clone())));
        }
        drop(guard);

        events.into_iter().for_each(|e| self.emit(e));
        if update.completed {
            self.finish(generation, snapshot, StopReason::Delivered);
            return false;
        }
        true
    }

    /// Apply a stage transition to the session: derived fields follow the
    /// new destination and the route is recomputed toward the customer.
    fn apply_stage_update(&self, active: &mut ActiveSession, update: StageUpdate) -> Option<TrackingEvent> {
        let (from, to) = update.transition?;
        let session = &mut active.session;

        session.route_stage = to;
        session.recompute_derived(self.config.travel_mode);
        if to == RouteStage::ToCustomer {
            let route = self
                .router
                .campus_route(session.current_location.point(), session.destination());
            session.set_route(route);
        }
        session.touch(Utc::now());

        tracing::info!(order_id = %session.order_id, from = %from, to = %to, "Route stage changed");
        Some(TrackingEvent::StageChanged {
            order_id: session.order_id.clone(),
            from,
            to,
        })
    }

    async fn perform_write(&self, write: OutboundWrite) {
        match write {
            OutboundWrite::Session(session) => {
                best_effort(
                    "push_session",
                    &session.order_id,
                    self.bridge.push_session(&session).await,
                );
            }
            OutboundWrite::Position(update) => {
                best_effort(
                    "push_position",
                    &update.order_id,
                    self.bridge.push_position(&update).await,
                );
            }
        }
    }
}

async fn run_location_task(
    shared: Arc<Shared>,
    generation: u64,
    mut fixes: mpsc::Receiver<LocationFix>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            fix = fixes.recv() => match fix {
                Some(fix) => shared.handle_fix(generation, fix),
                None => {
                    tracing::debug!(generation, "Location stream closed");
                    break;
                }
            },
        }
    }
}

async fn run_sync_task(
    shared: Arc<Shared>,
    generation: u64,
    mut outbound: mpsc::Receiver<OutboundWrite>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(shared.config.sync_interval.max(MIN_SYNC_INTERVAL));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            write = outbound.recv() => match write {
                Some(write) => shared.perform_write(write).await,
                None => break,
            },
            _ = interval.tick() => {
                let Some(session) = shared.snapshot(generation) else {
                    break;
                };
                best_effort(
                    "push_session",
                    &session.order_id,
                    shared.bridge.push_session(&session).await,
                );
            }
        }
    }
}

async fn run_status_task(
    shared: Arc<Shared>,
    generation: u64,
    order_id: String,
    cancel: CancellationToken,
) {
    let mut consecutive_errors: u32 = 0;

    loop {
        if consecutive_errors > 0 {
            let backoff = calculate_backoff(consecutive_errors);
            tracing::debug!(
                order_id = %order_id,
                backoff_secs = backoff.as_secs(),
                consecutive_errors,
                "Backing off before resubscribing to order status"
            );
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        let mut subscription = match shared.bridge.subscribe_status(&order_id) {
            Ok(subscription) => subscription,
            Err(e) => {
                consecutive_errors += 1;
                tracing::warn!(
                    order_id = %order_id,
                    error = %e,
                    consecutive_errors,
                    "Failed to subscribe to order status"
                );
                continue;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                status = subscription.next() => match status {
                    Some(status) => {
                        consecutive_errors = 0;
                        if !shared.apply_remote_status(generation, status) {
                            return;
                        }
                    }
                    None => {
                        consecutive_errors += 1;
                        tracing::warn!(order_id = %order_id, "Order status listener closed, resubscribing");
                        break;
                    }
                },
            }
        }
    }
}

/// Exponential backoff: 2^n seconds, capped at [`MAX_BACKOFF`].
fn calculate_backoff(consecutive_errors: u32) -> Duration {
    let secs = 2u64.saturating_pow(consecutive_errors.min(20));
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::StaticCoordinateLookup;
    use crate::location::SimulatedLocationProvider;
    use crate::storage::MemoryLocalStore;
    use crate::sync::{DocumentPath, InMemoryRemoteStore};
    use serde_json::json;

    const RESTAURANT: GeoPoint = GeoPoint {
        latitude: 36.1452,
        longitude: -86.8028,
    };
    const CUSTOMER: GeoPoint = GeoPoint {
        latitude: 36.1450,
        longitude: -86.8010,
    };

    struct Fixture {
        manager: TrackingSessionManager,
        remote: Arc<InMemoryRemoteStore>,
        local: Arc<MemoryLocalStore>,
    }

    fn fixture() -> Fixture {
        let provider = SimulatedLocationProvider::new();
        provider.handle().move_to(LocationFix::new(RESTAURANT));

        let lookup = StaticCoordinateLookup::new()
            .with_restaurant("rand", RESTAURANT)
            .with_place("Branscomb Quad", CUSTOMER);
        let remote = Arc::new(InMemoryRemoteStore::new());
        remote.apply_merge(
            &DocumentPath::order("order-1"),
            json!({
                "restaurantId": "rand",
                "deliveryAddress": "Branscomb Quad",
                "status": "accepted"
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let local = Arc::new(MemoryLocalStore::new());

        let manager = TrackingSessionManager::new(
            TrackingConfig::default(),
            Arc::new(provider),
            Arc::new(lookup),
            remote.clone(),
            local.clone(),
        );
        Fixture { manager, remote, local }
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(1), Duration::from_secs(2));
        assert_eq!(calculate_backoff(3), Duration::from_secs(8));
        assert_eq!(calculate_backoff(10), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_outbound_queue_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let session = {
            let f = fixture();
            f.manager.start_tracking("order-1", "deliverer-1").await.unwrap();
            let session = f.manager.get_current_delivery_tracking().unwrap();
            f.manager.stop_tracking();
            session
        };

        for _ in 0..OUTBOUND_CAPACITY {
            assert!(queue_write(&tx, OutboundWrite::Position(session.position_update())));
        }
        assert!(!queue_write(&tx, OutboundWrite::Position(session.position_update())));

        let mut queued = 0;
        while rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOUND_CAPACITY);

        drop(rx);
        assert!(!queue_write(&tx, OutboundWrite::Session(Box::new(session))));
    }

    #[tokio::test]
    async fn test_start_creates_session_heading_to_restaurant() {
        let f = fixture();
        f.manager.start_tracking("order-1", "deliverer-1").await.unwrap();

        let session = f.manager.get_current_delivery_tracking().unwrap();
        assert_eq!(session.route_stage, RouteStage::ToRestaurant);
        assert!(session.route.is_some());
        assert!(session.distance_remaining < 0.01);
        assert!(f.manager.is_tracking());
        assert!(!f.local.is_empty());

        f.manager.stop_tracking();
    }

    #[tokio::test]
    async fn test_update_route_stage_requires_matching_order() {
        let f = fixture();
        f.manager.start_tracking("order-1", "deliverer-1").await.unwrap();

        assert!(!f.manager.update_route_stage("order-2", RouteStage::ToCustomer));
        assert!(f.manager.update_route_stage("order-1", RouteStage::ToCustomer));
        assert!(!f.manager.update_route_stage("order-1", RouteStage::ToRestaurant));

        let session = f.manager.get_current_delivery_tracking().unwrap();
        assert_eq!(session.route_stage, RouteStage::ToCustomer);
        assert!((session.distance_remaining - 0.163).abs() < 0.01);
        assert_eq!(session.route.unwrap().to, CUSTOMER);

        f.manager.stop_tracking();
    }

    #[tokio::test]
    async fn test_completing_route_stops_session() {
        let f = fixture();
        let mut events = f.manager.subscribe_events();
        f.manager.start_tracking("order-1", "deliverer-1").await.unwrap();

        assert!(f.manager.update_route_stage("order-1", RouteStage::Completed));
        assert!(!f.manager.is_tracking());
        assert!(f.manager.get_current_delivery_tracking().is_none());

        let mut stops = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let TrackingEvent::Stopped { reason, .. } = event {
                stops.push(reason);
            }
        }
        assert_eq!(stops, vec![StopReason::Delivered]);
    }

    #[tokio::test]
    async fn test_closed_order_is_refused() {
        let f = fixture();
        f.remote.apply_merge(
            &DocumentPath::order("order-1"),
            json!({"status": "delivered"}).as_object().cloned().unwrap(),
        );

        let err = f.manager.start_tracking("order-1", "deliverer-1").await.unwrap_err();
        assert!(matches!(err, TrackingError::OrderClosed { .. }));
        assert!(!f.manager.is_tracking());
    }

    #[tokio::test]
    async fn test_unknown_order_and_address() {
        let f = fixture();
        let err = f.manager.start_tracking("order-9", "deliverer-1").await.unwrap_err();
        assert!(matches!(err, TrackingError::OrderUnavailable { .. }));

        f.remote.apply_merge(
            &DocumentPath::order("order-1"),
            json!({"deliveryAddress": "Somewhere Else"}).as_object().cloned().unwrap(),
        );
        let err = f.manager.start_tracking("order-1", "deliverer-1").await.unwrap_err();
        assert!(matches!(err, TrackingError::CoordinateResolution { .. }));
    }

    #[test]
    fn test_customer_tracking_outside_runtime_is_swallowed() {
        let f = fixture();
        assert!(!f.manager.start_customer_tracking("order-1", |_| {}));
        assert!(!f.manager.is_customer_tracking());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let f = fixture();
        f.manager.start_tracking("order-1", "deliverer-1").await.unwrap();

        assert!(f.manager.stop_tracking());
        assert!(!f.manager.stop_tracking());
        assert!(f.manager.get_current_delivery_tracking().is_none());
    }
}
