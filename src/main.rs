use anyhow::Result;
use clap::Parser;

use pipeline_board::cli::commands::{
    move_client::MoveCommand, show::ShowCommand, stages::StagesCommand, Command,
};
use pipeline_board::cli::{Cli, Commands};
use pipeline_board::config::PipelineBoardConfig;
use pipeline_board::observability::board_metrics;
use pipeline_board::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = PipelineBoardConfig::load_env_file() {
        eprintln!("⚠️  Ignoring unreadable .env file: {e}");
    }
    let mut config = PipelineBoardConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_telemetry(&config.observability)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        match cli.command {
            Commands::Show => ShowCommand::new(config).with_roster(cli.roster).execute().await,
            Commands::Move {
                client_id,
                stage,
                position,
            } => {
                MoveCommand::new(config, client_id, stage)
                    .with_position(position)
                    .with_roster(cli.roster)
                    .execute()
                    .await
            }
            Commands::Stages => StagesCommand::new(config).execute().await,
        }
    });

    if cli.verbose {
        board_metrics().log_stats();
    }
    result
}
