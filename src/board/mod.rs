// Stage-ordering engine: partitioning, moves, reconciliation and the board
// controller that ties them together.

pub mod controller;
pub mod moves;
pub mod partition;
pub mod reconcile;
pub mod types;

pub use controller::{Board, BoardNotification, BoardSettings, MoveTicket};
pub use moves::{MoveError, MoveStatus, OptimisticMove};
pub use partition::Partition;
pub use reconcile::{merge_pending, Admission, InFlightSet, MoveEvent, MoveLifecycle, SettledHistory};
pub use types::{Client, ClientId, MoveId, MoveRequest, Placement, StageAssignment, StageUpdate};
