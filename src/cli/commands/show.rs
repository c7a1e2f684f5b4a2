use anyhow::Result;
use std::path::PathBuf;

use crate::board::Partition;
use crate::cli::commands::{BoardSession, Command};
use crate::config::PipelineBoardConfig;
use crate::stages::StageRegistry;

pub struct ShowCommand {
    pub config: PipelineBoardConfig,
    pub roster: Option<PathBuf>,
}

impl ShowCommand {
    pub fn new(config: PipelineBoardConfig) -> Self {
        Self { config, roster: None }
    }

    pub fn with_roster(mut self, roster: Option<PathBuf>) -> Self {
        self.roster = roster;
        self
    }
}

impl Command for ShowCommand {
    async fn execute(&self) -> Result<()> {
        let session = BoardSession::open(&self.config, self.roster.as_deref()).await?;
        let partition = session.board.partition().await;

        println!("📋 Pipeline board: {} clients", partition.len());
        println!();
        print!("{}", render_board(&partition, session.board.registry()));
        Ok(())
    }
}

/// Text rendering of every stage, empty ones included
pub fn render_board(partition: &Partition, registry: &StageRegistry) -> String {
    let mut out = String::new();
    for (stage, clients) in partition.iter() {
        let label = registry
            .meta(stage)
            .map(|meta| meta.label.as_str())
            .unwrap_or(stage.key());
        out.push_str(&format!("▸ {} ({})\n", label, clients.len()));
        if clients.is_empty() {
            out.push_str("   (empty)\n");
        }
        for (index, client) in clients.iter().enumerate() {
            match &client.organization {
                Some(org) => out.push_str(&format!("   {}. #{} {} · {}\n", index, client.id, client.name, org)),
                None => out.push_str(&format!("   {}. #{} {}\n", index, client.id, client.name)),
            }
        }
        out.push('\n');
    }
    out
}
