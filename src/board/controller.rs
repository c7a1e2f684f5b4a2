// Board Controller
//
// Owns the rendered partition and the lifecycle of in-flight moves. The state
// mutex is never held across a call into the roster store.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, info, warn, Instrument};

use crate::board::moves::{MoveError, MoveStatus, OptimisticMove};
use crate::board::partition::Partition;
use crate::board::reconcile::{merge_pending, Admission, InFlightSet, SettledHistory};
use crate::board::types::{Client, ClientId, MoveId, MoveRequest, StageUpdate};
use crate::config::BoardConfig;
use crate::observability::board_metrics;
use crate::remote::{RemoteError, RosterStore};
use crate::stages::{StageId, StageRegistry};
use crate::telemetry::create_move_span;

/// User-visible, non-fatal board events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardNotification {
    /// Carries `MoveError::MoveFailed` with the rejected request
    MoveFailed {
        error: MoveError,
        occurred_at: DateTime<Utc>,
    },
}

impl BoardNotification {
    pub fn message(&self) -> String {
        match self {
            BoardNotification::MoveFailed { error, .. } => error.to_string(),
        }
    }

    pub fn request(&self) -> Option<&MoveRequest> {
        match self {
            BoardNotification::MoveFailed { error, .. } => error.request(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSettings {
    pub settled_history_limit: usize,
    pub notification_capacity: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

impl From<&BoardConfig> for BoardSettings {
    fn from(config: &BoardConfig) -> Self {
        Self {
            settled_history_limit: config.settled_history_limit,
            notification_capacity: config.notification_capacity.max(1),
        }
    }
}

/// Handle to a dispatched move
#[derive(Debug)]
pub struct MoveTicket {
    request: MoveRequest,
    receiver: oneshot::Receiver<MoveStatus>,
}

impl MoveTicket {
    pub fn move_id(&self) -> MoveId {
        self.request.id
    }

    pub fn request(&self) -> &MoveRequest {
        &self.request
    }

    /// Resolves once the move has settled and the board has been reconciled
    pub async fn settled(self) -> MoveStatus {
        self.receiver.await.unwrap_or_else(|_| MoveStatus::Failed {
            reason: "board was dropped before the move settled".to_string(),
        })
    }
}

struct BoardState {
    /// Last authoritative roster
    snapshot: Vec<Client>,
    partition: Arc<Partition>,
    in_flight: InFlightSet,
    history: SettledHistory,
    waiters: HashMap<MoveId, oneshot::Sender<MoveStatus>>,
    next_sequence: u64,
    fetch_generation: u64,
    applied_generation: u64,
}

impl BoardState {
    // Snapshot plus every still-pending placement. A settled move's placement
    // is gone from the in-flight set, so this is also the rollback path.
    fn rederive(&mut self, registry: &StageRegistry) {
        let fresh = Partition::build(self.snapshot.iter().cloned(), registry);
        self.partition = Arc::new(merge_pending(fresh, &self.in_flight));
    }
}

struct BoardInner<S: ?Sized> {
    store: Arc<S>,
    registry: StageRegistry,
    state: Mutex<BoardState>,
    notifications: broadcast::Sender<BoardNotification>,
}

/// Cheaply cloneable handle to one pipeline board. `S` may be a trait object
/// (`Board<dyn RosterStore>`) when the store is chosen at runtime.
pub struct Board<S: ?Sized> {
    inner: Arc<BoardInner<S>>,
}

impl<S: ?Sized> Clone for Board<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RosterStore + ?Sized + 'static> Board<S> {
    /// Empty board; call `refresh` to pull the roster
    pub fn new(store: Arc<S>, registry: StageRegistry, settings: BoardSettings) -> Self {
        let (notifications, _) = broadcast::channel(settings.notification_capacity.max(1));
        let partition = Arc::new(Partition::empty(&registry));
        Self {
            inner: Arc::new(BoardInner {
                store,
                registry,
                state: Mutex::new(BoardState {
                    snapshot: Vec::new(),
                    partition,
                    in_flight: InFlightSet::new(),
                    history: SettledHistory::new(settings.settled_history_limit),
                    waiters: HashMap::new(),
                    next_sequence: 0,
                    fetch_generation: 0,
                    applied_generation: 0,
                }),
                notifications,
            }),
        }
    }

    pub async fn load(store: Arc<S>, registry: StageRegistry) -> Result<Self, RemoteError> {
        let board = Self::new(store, registry, BoardSettings::default());
        board.refresh().await?;
        Ok(board)
    }

    /// Authoritative fetch, then merge of still-pending placements
    pub async fn refresh(&self) -> Result<Arc<Partition>, RemoteError> {
        crate::time_operation!("roster_refresh");
        let metrics = board_metrics();

        let generation = {
            let mut state = self.inner.state.lock().await;
            state.fetch_generation += 1;
            state.fetch_generation
        };
        metrics.record_refetch();

        let clients = self.inner.store.fetch_clients().await?;

        let mut state = self.inner.state.lock().await;
        if generation < state.applied_generation {
            metrics.record_stale_refetch();
            debug!(generation, applied = state.applied_generation, "Discarding stale refetch");
            return Ok(Arc::clone(&state.partition));
        }
        state.applied_generation = generation;
        state.snapshot = clients;
        state.rederive(&self.inner.registry);
        debug!(
            generation,
            clients = state.partition.len(),
            pending = state.in_flight.len(),
            "Board refreshed"
        );
        Ok(Arc::clone(&state.partition))
    }

    /// Currently rendered partition. Replaced wholesale on every recompute.
    pub async fn partition(&self) -> Arc<Partition> {
        Arc::clone(&self.inner.state.lock().await.partition)
    }

    pub async fn stage_counts(&self) -> Vec<(StageId, usize)> {
        self.inner.state.lock().await.partition.counts()
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.inner.registry
    }

    pub async fn move_status(&self, move_id: MoveId) -> Option<MoveStatus> {
        let state = self.inner.state.lock().await;
        state
            .in_flight
            .status(move_id)
            .or_else(|| state.history.get(move_id).cloned())
    }

    /// Outstanding moves, oldest first
    pub async fn pending_moves(&self) -> Vec<MoveRequest> {
        self.inner.state.lock().await.in_flight.requests()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardNotification> {
        self.inner.notifications.subscribe()
    }

    /// Apply a move optimistically and dispatch its remote write.
    ///
    /// Local rejections (unknown stage, client not on the board) return `Err`
    /// and change nothing. A move for a client that already has one in flight
    /// is rendered immediately but its write waits for the earlier one.
    pub async fn move_client(
        &self,
        client_id: ClientId,
        target_stage: &str,
        target_position: Option<usize>,
    ) -> Result<MoveTicket, MoveError> {
        let metrics = board_metrics();
        let request = MoveRequest::resolve(&self.inner.registry, client_id, target_stage, target_position)
            .inspect_err(|e| {
                metrics.record_move_rejected();
                warn!(client_id, stage = target_stage, "Move rejected: {}", e);
            })?;

        let (sender, receiver) = oneshot::channel();
        let admission = {
            let mut state = self.inner.state.lock().await;
            let optimistic = OptimisticMove::compute(&state.partition, &request).inspect_err(|e| {
                metrics.record_move_rejected();
                warn!(client_id, stage = %request.target_stage, "Move rejected: {}", e);
            })?;
            if optimistic.is_noop() {
                debug!(client_id, "Move keeps client in place; dispatching anyway");
            }

            let update = optimistic.stage_update();
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.partition = Arc::new(optimistic.partition);
            state.waiters.insert(request.id, sender);
            state
                .in_flight
                .admit(request.clone(), optimistic.placement, update, sequence)
        };

        match admission {
            Admission::Dispatch(update) => {
                metrics.record_move_dispatched();
                self.spawn_update(request.clone(), update);
            }
            Admission::Queued => {
                metrics.record_move_queued();
                info!(
                    move_id = %request.id,
                    client_id,
                    "Client already has a move in flight; queued"
                );
            }
        }

        Ok(MoveTicket { request, receiver })
    }

    // One task per client chain: each write is followed by reconciliation,
    // which may hand back the next queued move for the same client.
    fn spawn_update(&self, request: MoveRequest, update: StageUpdate) {
        let board = self.clone();
        tokio::spawn(async move {
            let mut next = Some((request, update));
            while let Some((request, update)) = next.take() {
                let span = create_move_span(request.id, request.client_id, request.target_stage.key());
                let result = board
                    .inner
                    .store
                    .update_stage(&update)
                    .instrument(span.clone())
                    .await
                    .map_err(|e| MoveError::MoveFailed {
                        request: request.clone(),
                        reason: e.to_string(),
                    });
                next = board.reconcile(request, result).instrument(span).await;
            }
        });
    }

    async fn reconcile(
        &self,
        request: MoveRequest,
        result: Result<(), MoveError>,
    ) -> Option<(MoveRequest, StageUpdate)> {
        let metrics = board_metrics();
        // The settled status is queryable from here on, before the refetch
        let settlement = {
            let mut state = self.inner.state.lock().await;
            let settlement = state
                .in_flight
                .settle(&request, result.as_ref().map(|_| ()).map_err(MoveError::reason));
            if let Some(settlement) = &settlement {
                state.history.record(request.id, settlement.status.clone());
            }
            settlement
        };
        let Some(settlement) = settlement else {
            debug!(move_id = %request.id, "Move already settled; ignoring");
            return None;
        };
        if settlement.next.is_some() {
            metrics.record_move_dispatched();
        }

        // Both outcomes take the same path: drop cached reads and re-derive
        // from fresh data. If the refetch fails, fall back to the last snapshot.
        self.inner.store.invalidate().await;
        if let Err(e) = self.refresh().await {
            warn!("Refetch after settlement failed, using last snapshot: {}", e);
            self.inner.state.lock().await.rederive(&self.inner.registry);
        }

        let waiter = self.inner.state.lock().await.waiters.remove(&request.id);

        match result {
            Err(error) => {
                metrics.record_move_failed();
                let notification = BoardNotification::MoveFailed {
                    error,
                    occurred_at: Utc::now(),
                };
                if self.inner.notifications.send(notification).is_err() {
                    debug!("No subscribers for move failure notification");
                }
            }
            Ok(()) => metrics.record_move_succeeded(),
        }

        if let Some(waiter) = waiter {
            let _ = waiter.send(settlement.status);
        }

        settlement.next
    }
}
