use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::board::{Board, BoardSettings};
use crate::config::PipelineBoardConfig;
use crate::remote::{InMemoryRosterStore, RestRosterStore, RosterStore};

pub mod move_client;
pub mod show;
pub mod stages;

/// A loaded board plus, in offline mode, the roster file to write back
pub struct BoardSession {
    pub board: Board<dyn RosterStore>,
    offline: Option<(Arc<InMemoryRosterStore>, PathBuf)>,
}

impl BoardSession {
    pub async fn open(config: &PipelineBoardConfig, roster: Option<&Path>) -> Result<Self> {
        let registry = config.registry()?;
        let settings = BoardSettings::from(&config.board);

        let mut offline = None;
        let store: Arc<dyn RosterStore> = match roster {
            Some(path) => {
                let store = Arc::new(InMemoryRosterStore::load_json(path).await?);
                offline = Some((Arc::clone(&store), path.to_path_buf()));
                store
            }
            None => Arc::new(RestRosterStore::new(&config.remote).context(
                "Data service is not configured; set remote.base_url and remote.api_key or pass --roster",
            )?),
        };

        let board = Board::new(store, registry, settings);
        board
            .refresh()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load the client roster: {e} ({})", e.hint()))?;
        Ok(Self { board, offline })
    }

    /// Write the offline roster back to its file. No-op against the data service.
    pub async fn persist(&self) -> Result<()> {
        if let Some((store, path)) = &self.offline {
            store.save_json(path).await?;
            tracing::debug!(path = %path.display(), "Saved roster");
        }
        Ok(())
    }
}

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
