// In-memory roster store
//
// Behaves like the hosted service for offline boards and tests: positions are
// renormalized densely per stage on every write, writes can be held back, and
// failures can be injected per call.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify, Semaphore};

use crate::board::partition::Partition;
use crate::board::types::{Client, Placement, StageUpdate};
use crate::remote::{RemoteError, RosterStore};
use crate::stages::StageRegistry;

pub struct InMemoryRosterStore {
    clients: Mutex<Vec<Client>>,
    update_failures: Mutex<VecDeque<RemoteError>>,
    fetch_failures: Mutex<VecDeque<RemoteError>>,
    received_updates: Mutex<Vec<StageUpdate>>,
    update_arrived: Notify,
    hold: AtomicBool,
    gate: Semaphore,
    fetches: AtomicUsize,
    invalidations: AtomicUsize,
}

impl InMemoryRosterStore {
    pub fn new(clients: Vec<Client>) -> Self {
        Self {
            clients: Mutex::new(clients),
            update_failures: Mutex::new(VecDeque::new()),
            fetch_failures: Mutex::new(VecDeque::new()),
            received_updates: Mutex::new(Vec::new()),
            update_arrived: Notify::new(),
            hold: AtomicBool::new(false),
            gate: Semaphore::new(0),
            fetches: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    /// Load a roster from a JSON array of client rows
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, RemoteError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RemoteError::Config(format!("cannot read {}: {e}", path.display())))?;
        let clients: Vec<Client> = serde_json::from_str(&raw)?;
        Ok(Self::new(clients))
    }

    /// Write the current roster back as a JSON array
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), RemoteError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot().await)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| RemoteError::Config(format!("cannot write {}: {e}", path.display())))
    }

    pub async fn snapshot(&self) -> Vec<Client> {
        self.clients.lock().await.clone()
    }

    /// Fail the next update with `error`. Calls queue up in order.
    pub async fn fail_next_update(&self, error: RemoteError) {
        self.update_failures.lock().await.push_back(error);
    }

    pub async fn fail_next_fetch(&self, error: RemoteError) {
        self.fetch_failures.lock().await.push_back(error);
    }

    /// Park incoming updates until released
    pub fn hold_updates(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// Let the next `count` held updates proceed, parked now or later
    pub fn release_updates(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub async fn received_updates(&self) -> Vec<StageUpdate> {
        self.received_updates.lock().await.clone()
    }

    /// Resolve once at least `count` updates have reached the store
    pub async fn wait_for_updates(&self, count: usize) {
        loop {
            let notified = self.update_arrived.notified();
            if self.received_updates.lock().await.len() >= count {
                return;
            }
            notified.await;
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Replace a row as if another operator had edited it
    pub async fn upsert(&self, client: Client) {
        let mut clients = self.clients.lock().await;
        match clients.iter_mut().find(|existing| existing.id == client.id) {
            Some(existing) => *existing = client,
            None => clients.push(client),
        }
    }

    async fn park_if_held(&self) {
        if !self.hold.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

// Same dense renumbering the hosted service applies: every stage is
// rewritten as 0..n in its current order.
fn normalize(clients: &[Client], update: &StageUpdate) -> Option<Vec<Client>> {
    let registry = StageRegistry::default();
    let mut partition = Partition::build(clients.iter().cloned(), &registry);
    partition.apply_placement(&Placement {
        client_id: update.client_id,
        stage: update.stage,
        index: update.position.map_or(usize::MAX, |p| p as usize),
    })?;

    let mut normalized: Vec<Client> = partition
        .iter()
        .flat_map(|(stage, column)| {
            column.iter().enumerate().map(move |(index, client)| {
                let mut client = client.clone();
                client.stage = Some(stage);
                client.position = u32::try_from(index).ok();
                client
            })
        })
        .collect();
    normalized.sort_by_key(|client| client.id);
    Some(normalized)
}

#[async_trait::async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn fetch_clients(&self) -> Result<Vec<Client>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fetch_failures.lock().await.pop_front() {
            return Err(error);
        }
        let mut clients = self.snapshot().await;
        clients.sort_by_key(|client| client.id);
        Ok(clients)
    }

    async fn update_stage(&self, update: &StageUpdate) -> Result<(), RemoteError> {
        self.received_updates.lock().await.push(update.clone());
        self.update_arrived.notify_waiters();
        self.park_if_held().await;

        if let Some(error) = self.update_failures.lock().await.pop_front() {
            return Err(error);
        }

        let mut clients = self.clients.lock().await;
        let normalized = normalize(&clients, update).ok_or_else(|| RemoteError::NotFound {
            resource: format!("client {}", update.client_id),
        })?;
        *clients = normalized;
        Ok(())
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageId;

    #[tokio::test]
    async fn test_update_renumbers_positions_densely() {
        let store = InMemoryRosterStore::new(vec![
            Client::new(1, "a").with_stage(StageId::Lead, 0),
            Client::new(2, "b").with_stage(StageId::Lead, 5),
            Client::new(3, "c").with_stage(StageId::Proposta, 9),
        ]);

        store
            .update_stage(&StageUpdate {
                client_id: 1,
                stage: StageId::Proposta,
                position: Some(0),
            })
            .await
            .unwrap();

        let clients = store.fetch_clients().await.unwrap();
        let placed: Vec<(i64, Option<StageId>, Option<u32>)> =
            clients.iter().map(|c| (c.id, c.stage, c.position)).collect();
        assert_eq!(
            placed,
            vec![
                (1, Some(StageId::Proposta), Some(0)),
                (2, Some(StageId::Lead), Some(0)),
                (3, Some(StageId::Proposta), Some(1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_for_unknown_client_is_not_found() {
        let store = InMemoryRosterStore::new(vec![]);
        let err = store
            .update_stage(&StageUpdate {
                client_id: 42,
                stage: StageId::Lead,
                position: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let store = InMemoryRosterStore::new(vec![Client::new(1, "a")]);
        store.fail_next_fetch(RemoteError::Network("offline".to_string())).await;

        assert!(store.fetch_clients().await.is_err());
        assert!(store.fetch_clients().await.is_ok());
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        tokio::fs::write(
            &path,
            r#"[{"id": 1, "name": "Acme", "pipeline_stage": "negociacao", "pipeline_position": 0}]"#,
        )
        .await
        .unwrap();

        let store = InMemoryRosterStore::load_json(&path).await.unwrap();
        store
            .update_stage(&StageUpdate {
                client_id: 1,
                stage: StageId::Fechado,
                position: None,
            })
            .await
            .unwrap();
        store.save_json(&path).await.unwrap();

        let reloaded = InMemoryRosterStore::load_json(&path).await.unwrap();
        let clients = reloaded.snapshot().await;
        assert_eq!(clients[0].stage, Some(StageId::Fechado));
    }
}
