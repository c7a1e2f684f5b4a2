// Reconciliation Policy
//
// Each move runs through a small state machine (queued -> pending -> settled).
// Moves are serialized per client through a keyed in-flight set; moves of
// different clients never wait on each other.

use statig::prelude::*;
use std::collections::{HashMap, VecDeque};

use crate::board::moves::MoveStatus;
use crate::board::partition::Partition;
use crate::board::types::{ClientId, MoveId, MoveRequest, Placement, StageUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveEvent {
    Dispatch,
    Succeed,
    Fail { reason: String },
}

pub struct MoveLifecycle {
    request: MoveRequest,
    placement: Placement,
    update: StageUpdate,
    sequence: u64,
    status: MoveStatus,
}

impl MoveLifecycle {
    pub fn new(request: MoveRequest, placement: Placement, update: StageUpdate, sequence: u64) -> Self {
        Self {
            request,
            placement,
            update,
            sequence,
            status: MoveStatus::Queued,
        }
    }

    pub fn request(&self) -> &MoveRequest {
        &self.request
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn update(&self) -> &StageUpdate {
        &self.update
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn status(&self) -> &MoveStatus {
        &self.status
    }
}

#[state_machine(initial = "State::queued()")]
impl MoveLifecycle {
    #[state]
    fn queued(&mut self, event: &MoveEvent) -> Outcome<State> {
        match event {
            MoveEvent::Dispatch => {
                self.status = MoveStatus::Pending;
                tracing::debug!(
                    move_id = %self.request.id,
                    client_id = self.request.client_id,
                    "Move dispatched"
                );
                Transition(State::pending())
            }
            _ => Handled,
        }
    }

    #[state]
    fn pending(&mut self, event: &MoveEvent) -> Outcome<State> {
        match event {
            MoveEvent::Succeed => {
                self.status = MoveStatus::Succeeded;
                tracing::info!(
                    move_id = %self.request.id,
                    client_id = self.request.client_id,
                    stage = %self.request.target_stage,
                    "Move settled successfully"
                );
                Transition(State::succeeded())
            }
            MoveEvent::Fail { reason } => {
                self.status = MoveStatus::Failed {
                    reason: reason.clone(),
                };
                tracing::warn!(
                    move_id = %self.request.id,
                    client_id = self.request.client_id,
                    stage = %self.request.target_stage,
                    reason = %reason,
                    "Move failed"
                );
                Transition(State::failed())
            }
            MoveEvent::Dispatch => Handled,
        }
    }

    #[state]
    fn succeeded(&mut self, event: &MoveEvent) -> Outcome<State> {
        tracing::debug!(move_id = %self.request.id, ?event, "Ignoring event for settled move");
        Handled
    }

    #[state]
    fn failed(&mut self, event: &MoveEvent) -> Outcome<State> {
        tracing::debug!(move_id = %self.request.id, ?event, "Ignoring event for settled move");
        Handled
    }
}

/// Outcome of admitting a move into the in-flight set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No earlier move for this client; send the write now
    Dispatch(StageUpdate),
    /// Another move for this client is pending; the write waits its turn
    Queued,
}

#[derive(Debug, Clone)]
pub struct Settlement {
    pub request: MoveRequest,
    pub status: MoveStatus,
    /// Next queued move for the same client, now dispatched
    pub next: Option<(MoveRequest, StageUpdate)>,
}

struct ClientMoves {
    active: StateMachine<MoveLifecycle>,
    queued: VecDeque<StateMachine<MoveLifecycle>>,
}

impl ClientMoves {
    fn latest(&self) -> &MoveLifecycle {
        self.queued
            .back()
            .map(|lifecycle| lifecycle.inner())
            .unwrap_or_else(|| self.active.inner())
    }

    fn all(&self) -> impl Iterator<Item = &MoveLifecycle> {
        std::iter::once(self.active.inner()).chain(self.queued.iter().map(|lifecycle| lifecycle.inner()))
    }
}

/// Keyed in-flight set: `ClientId -> outstanding moves`
#[derive(Default)]
pub struct InFlightSet {
    clients: HashMap<ClientId, ClientMoves>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(
        &mut self,
        request: MoveRequest,
        placement: Placement,
        update: StageUpdate,
        sequence: u64,
    ) -> Admission {
        let client_id = request.client_id;
        let mut lifecycle = MoveLifecycle::new(request, placement, update.clone(), sequence).state_machine();

        if let Some(moves) = self.clients.get_mut(&client_id) {
            moves.queued.push_back(lifecycle);
            return Admission::Queued;
        }

        lifecycle.handle(&MoveEvent::Dispatch);
        self.clients.insert(
            client_id,
            ClientMoves {
                active: lifecycle,
                queued: VecDeque::new(),
            },
        );
        Admission::Dispatch(update)
    }

    /// Settle the active move of `request.client_id`. Returns `None` when the
    /// move is not the one in flight (already settled or never dispatched).
    pub fn settle(&mut self, request: &MoveRequest, result: Result<(), String>) -> Option<Settlement> {
        let moves = self.clients.get_mut(&request.client_id)?;
        if moves.active.inner().request().id != request.id {
            return None;
        }

        let event = match result {
            Ok(()) => MoveEvent::Succeed,
            Err(reason) => MoveEvent::Fail { reason },
        };
        moves.active.handle(&event);
        let status = moves.active.inner().status().clone();

        let next = if let Some(mut lifecycle) = moves.queued.pop_front() {
            lifecycle.handle(&MoveEvent::Dispatch);
            let next = (lifecycle.inner().request().clone(), lifecycle.inner().update().clone());
            moves.active = lifecycle;
            Some(next)
        } else {
            None
        };
        if next.is_none() {
            self.clients.remove(&request.client_id);
        }

        Some(Settlement {
            request: request.clone(),
            status,
            next,
        })
    }

    pub fn is_pending(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn status(&self, move_id: MoveId) -> Option<MoveStatus> {
        self.clients
            .values()
            .flat_map(|moves| moves.all())
            .find(|lifecycle| lifecycle.request().id == move_id)
            .map(|lifecycle| lifecycle.status().clone())
    }

    /// Outstanding requests in dispatch order
    pub fn requests(&self) -> Vec<MoveRequest> {
        let mut lifecycles: Vec<&MoveLifecycle> = self.clients.values().flat_map(|moves| moves.all()).collect();
        lifecycles.sort_by_key(|lifecycle| lifecycle.sequence());
        lifecycles
            .into_iter()
            .map(|lifecycle| lifecycle.request().clone())
            .collect()
    }

    /// Latest optimistic placement per client, in the order they were made
    pub fn placements(&self) -> Vec<Placement> {
        let mut latest: Vec<&MoveLifecycle> = self.clients.values().map(|moves| moves.latest()).collect();
        latest.sort_by_key(|lifecycle| lifecycle.sequence());
        latest.into_iter().map(|lifecycle| *lifecycle.placement()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.values().map(|moves| 1 + moves.queued.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Refetch-merge: fresh authoritative data first, then every still-pending
/// placement reapplied on top, keyed by client id.
pub fn merge_pending(fresh: Partition, in_flight: &InFlightSet) -> Partition {
    let mut merged = fresh;
    for placement in in_flight.placements() {
        if merged.apply_placement(&placement).is_none() {
            tracing::debug!(
                client_id = placement.client_id,
                "Client with pending move is missing from refetched roster"
            );
        }
    }
    merged
}

/// Bounded record of settled moves, oldest evicted first
pub struct SettledHistory {
    limit: usize,
    order: VecDeque<MoveId>,
    statuses: HashMap<MoveId, MoveStatus>,
}

impl SettledHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            order: VecDeque::new(),
            statuses: HashMap::new(),
        }
    }

    pub fn record(&mut self, move_id: MoveId, status: MoveStatus) {
        if self.statuses.insert(move_id, status).is_none() {
            self.order.push_back(move_id);
        }
        while self.order.len() > self.limit {
            if let Some(evicted) = self.order.pop_front() {
                self.statuses.remove(&evicted);
            }
        }
    }

    pub fn get(&self, move_id: MoveId) -> Option<&MoveStatus> {
        self.statuses.get(&move_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
