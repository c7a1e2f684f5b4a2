use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "pipeline-board")]
#[command(about = "Client pipeline board: view stages and move clients between them")]
#[command(long_about = "Renders the client pipeline as stage columns and moves clients between stages. \
                       Moves are applied optimistically and reconciled against the hosted data service, \
                       or against a local JSON roster with --roster.")]
pub struct Cli {
    /// Configuration file layered over pipeline-board.toml and defaults
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work against a local JSON roster instead of the data service
    #[arg(long, global = true, value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the board: every stage with its clients in order
    Show,
    /// Move a client to a stage, optionally at a position within it
    Move {
        /// Client identifier
        client_id: i64,
        /// Target stage key (lead, qualificacao, proposta, negociacao, fechado, perdido)
        stage: String,
        /// Zero-based position in the target stage; appends when omitted
        #[arg(long, short = 'p')]
        position: Option<usize>,
    },
    /// List pipeline stages with their labels and colors
    Stages,
}
