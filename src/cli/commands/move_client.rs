use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::board::{ClientId, MoveStatus};
use crate::cli::commands::{BoardSession, Command};
use crate::config::PipelineBoardConfig;

pub struct MoveCommand {
    pub config: PipelineBoardConfig,
    pub roster: Option<PathBuf>,
    pub client_id: ClientId,
    pub stage: String,
    pub position: Option<usize>,
}

impl MoveCommand {
    pub fn new(config: PipelineBoardConfig, client_id: ClientId, stage: String) -> Self {
        Self {
            config,
            roster: None,
            client_id,
            stage,
            position: None,
        }
    }

    pub fn with_position(mut self, position: Option<usize>) -> Self {
        self.position = position;
        self
    }

    pub fn with_roster(mut self, roster: Option<PathBuf>) -> Self {
        self.roster = roster;
        self
    }
}

impl Command for MoveCommand {
    async fn execute(&self) -> Result<()> {
        let session = BoardSession::open(&self.config, self.roster.as_deref()).await?;
        let board = &session.board;

        let ticket = match board.move_client(self.client_id, &self.stage, self.position).await {
            Ok(ticket) => ticket,
            Err(e) => {
                println!("❌ {e}");
                bail!(e);
            }
        };
        let target = ticket.request().target_stage;
        let label = board
            .registry()
            .meta(target)
            .map(|meta| meta.label.clone())
            .unwrap_or_else(|| target.key().to_string());
        println!("🚚 Moving client {} to {}...", self.client_id, label);

        match ticket.settled().await {
            MoveStatus::Succeeded => {
                session.persist().await?;
                let partition = board.partition().await;
                match partition.locate(self.client_id) {
                    Some((stage, index)) => {
                        println!("✅ Client {} is now in {} at position {}", self.client_id, stage, index)
                    }
                    None => println!("✅ Move saved for client {}", self.client_id),
                }
                Ok(())
            }
            MoveStatus::Failed { reason } => {
                println!("❌ Move failed: {reason}");
                println!("   The board was restored from the data service");
                bail!("move of client {} to {} failed: {}", self.client_id, target, reason)
            }
            status => bail!("move ended unsettled: {:?}", status),
        }
    }
}
