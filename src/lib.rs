// Pipeline Board - stage-ordering engine for the client pipeline kanban
// This exposes the core components for testing and integration

pub mod board;
pub mod cli;
pub mod config;
pub mod http;
pub mod observability;
pub mod remote;
pub mod stages;
pub mod telemetry;

// Re-export key types for easy access
pub use board::{
    Board, BoardNotification, BoardSettings, Client, ClientId, MoveError, MoveId, MoveRequest, MoveStatus,
    MoveTicket, Partition, StageUpdate,
};
pub use config::{PipelineBoardConfig, RemoteConfig};
pub use http::RateLimitedHttpClient;
pub use observability::{board_metrics, BoardMetrics, OperationTimer};
pub use remote::{InMemoryRosterStore, RemoteError, RestRosterStore, RosterStore};
pub use stages::{StageId, StageMeta, StageRegistry};
pub use telemetry::{create_move_span, generate_correlation_id, init_telemetry};
