// Move Operation - relocates one client and produces the optimistic partition

use thiserror::Error;

use crate::board::partition::Partition;
use crate::board::types::{ClientId, MoveId, MoveRequest, Placement, StageUpdate};
use crate::stages::{StageId, StageRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// Target stage is not in the registry. Rejected before dispatch.
    #[error("Invalid target stage '{stage}'")]
    InvalidTarget { stage: String },
    /// Client is not in the rendered partition. No state change.
    #[error("Client {client_id} is not on the board")]
    ClientNotFound { client_id: ClientId },
    /// Remote rejection or transport failure after dispatch
    #[error("Moving client {} to {} failed: {reason}", .request.client_id, .request.target_stage)]
    MoveFailed { request: MoveRequest, reason: String },
}

impl MoveError {
    /// Local rejections come from stale or impossible gestures and are only logged.
    pub fn is_local(&self) -> bool {
        matches!(self, MoveError::InvalidTarget { .. } | MoveError::ClientNotFound { .. })
    }

    /// Text recorded in `MoveStatus::Failed`
    pub fn reason(&self) -> String {
        match self {
            MoveError::MoveFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    pub fn request(&self) -> Option<&MoveRequest> {
        match self {
            MoveError::MoveFailed { request, .. } => Some(request),
            _ => None,
        }
    }
}

/// Observable reconciliation state of one move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveStatus {
    /// Waiting for an earlier move of the same client to settle
    Queued,
    /// Remote write in flight
    Pending,
    Succeeded,
    Failed { reason: String },
}

impl MoveStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, MoveStatus::Succeeded | MoveStatus::Failed { .. })
    }
}

impl MoveRequest {
    /// Validate a gesture coming from the rendering layer
    pub fn resolve(
        registry: &StageRegistry,
        client_id: ClientId,
        target_stage: &str,
        target_position: Option<usize>,
    ) -> Result<Self, MoveError> {
        let target_stage = registry
            .resolve(target_stage)
            .map_err(|_| MoveError::InvalidTarget {
                stage: target_stage.to_string(),
            })?;

        Ok(Self {
            id: MoveId::new(),
            client_id,
            target_stage,
            target_position,
        })
    }
}

/// Result of applying a move locally, before any remote settlement
#[derive(Debug, Clone)]
pub struct OptimisticMove {
    pub from: (StageId, usize),
    pub placement: Placement,
    pub partition: Partition,
}

impl OptimisticMove {
    /// Remove the client from its current stage and insert it into the target
    /// stage at the requested index, clamped to `[0, len]`. A missing index
    /// appends.
    pub fn compute(current: &Partition, request: &MoveRequest) -> Result<Self, MoveError> {
        let from = current
            .locate(request.client_id)
            .ok_or(MoveError::ClientNotFound {
                client_id: request.client_id,
            })?;

        let mut partition = current.clone();
        let requested = Placement {
            client_id: request.client_id,
            stage: request.target_stage,
            index: request.target_position.unwrap_or(usize::MAX),
        };
        let placement = partition
            .apply_placement(&requested)
            .ok_or(MoveError::ClientNotFound {
                client_id: request.client_id,
            })?;

        Ok(Self {
            from,
            placement,
            partition,
        })
    }

    /// Same stage and index as before the move
    pub fn is_noop(&self) -> bool {
        self.from == (self.placement.stage, self.placement.index)
    }

    /// Remote write for this move. The index is sent as an ordering hint; the
    /// service normalizes positions itself.
    pub fn stage_update(&self) -> StageUpdate {
        StageUpdate {
            client_id: self.placement.client_id,
            stage: self.placement.stage,
            position: u32::try_from(self.placement.index).ok(),
        }
    }
}
