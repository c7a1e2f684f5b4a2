use anyhow::Result;

use crate::cli::commands::Command;
use crate::config::PipelineBoardConfig;

pub struct StagesCommand {
    pub config: PipelineBoardConfig,
}

impl StagesCommand {
    pub fn new(config: PipelineBoardConfig) -> Self {
        Self { config }
    }
}

impl Command for StagesCommand {
    async fn execute(&self) -> Result<()> {
        let registry = self.config.registry()?;

        println!("🗂️  Pipeline stages ({}):", registry.len());
        for (index, meta) in registry.iter().enumerate() {
            println!("   {}. {:<14} {:<14} {}", index + 1, meta.id.key(), meta.label, meta.display_color);
        }
        Ok(())
    }
}
