use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::board::types::{Client, StageUpdate};
use crate::config::RemoteConfig;
use crate::http::RateLimitedHttpClient;
use crate::remote::{RemoteError, RosterStore};

const SELECT_COLUMNS: &str = "id,name,organization,email,pipeline_stage,pipeline_position";

/// Roster store backed by the hosted data service's REST endpoint
#[derive(Debug)]
pub struct RestRosterStore {
    http: RateLimitedHttpClient,
    table: String,
    fetch_max_attempts: u32,
    retry_delay: Duration,
}

impl RestRosterStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: RateLimitedHttpClient::new(config)?,
            table: config.table.clone(),
            fetch_max_attempts: config.fetch_max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    fn roster_path(&self) -> String {
        format!("rest/v1/{}?select={}&order=id.asc", self.table, SELECT_COLUMNS)
    }

    fn client_path(&self, client_id: i64) -> String {
        format!("rest/v1/{}?id=eq.{}", self.table, client_id)
    }
}

#[async_trait::async_trait]
impl RosterStore for RestRosterStore {
    async fn fetch_clients(&self) -> Result<Vec<Client>, RemoteError> {
        let path = self.roster_path();
        let mut attempts = 0;

        // Reads are idempotent, so transient failures are retried here.
        // Writes never are.
        loop {
            attempts += 1;
            match self.http.get_json::<Vec<Client>>(&path, true).await {
                Ok(clients) => {
                    debug!(count = clients.len(), "Fetched client roster");
                    return Ok(clients);
                }
                Err(e) if e.is_transient() && attempts < self.fetch_max_attempts => {
                    warn!("Roster fetch failed (attempt {}): {}", attempts, e);
                    tokio::time::sleep(self.retry_delay * attempts).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn update_stage(&self, update: &StageUpdate) -> Result<(), RemoteError> {
        let body = json!({
            "pipeline_stage": update.stage.key(),
            "pipeline_position": update.position,
        });
        let rows = self.http.patch_json(&self.client_path(update.client_id), &body).await;

        // Any write attempt may have changed the table
        self.http.invalidate_cache_pattern(&self.table).await;

        let rows = rows?;
        if rows.as_array().is_some_and(|rows| rows.is_empty()) {
            return Err(RemoteError::NotFound {
                resource: format!("client {}", update.client_id),
            });
        }
        Ok(())
    }

    async fn invalidate(&self) {
        self.http.clear_cache().await;
    }
}
