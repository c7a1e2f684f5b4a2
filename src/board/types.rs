use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::stages::{StageId, StageRegistry};

pub type ClientId = i64;

/// A client row as returned by the data service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(
        default,
        rename = "pipeline_stage",
        deserialize_with = "crate::stages::deserialize_lenient"
    )]
    pub stage: Option<StageId>,
    #[serde(
        default,
        rename = "pipeline_position",
        deserialize_with = "deserialize_position"
    )]
    pub position: Option<u32>,
}

impl Client {
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            organization: None,
            email: None,
            stage: None,
            position: None,
        }
    }

    pub fn with_stage(mut self, stage: StageId, position: u32) -> Self {
        self.stage = Some(stage);
        self.position = Some(position);
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Effective assignment: missing stage falls back to the registry's first
    /// stage, missing position to 0.
    pub fn assignment(&self, registry: &StageRegistry) -> StageAssignment {
        StageAssignment {
            stage: self.stage.unwrap_or_else(|| registry.first()),
            position: self.position.unwrap_or(0),
        }
    }
}

// Negative or out-of-range positions from the service are treated as absent.
fn deserialize_position<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| u32::try_from(value).ok()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageAssignment {
    pub stage: StageId,
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveId(Uuid);

impl MoveId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MoveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request to relocate one client. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub id: MoveId,
    pub client_id: ClientId,
    pub target_stage: StageId,
    /// `None` appends at the end of the target stage
    pub target_position: Option<usize>,
}

/// Where a move put a client in the locally rendered partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub client_id: ClientId,
    pub stage: StageId,
    pub index: usize,
}

/// Payload of the single remote write issued per move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub client_id: ClientId,
    pub stage: StageId,
    pub position: Option<u32>,
}
