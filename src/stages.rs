// Stage Registry - the fixed, ordered set of pipeline columns
// Declaration order of `StageId` is the left-to-right board layout.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    Lead,
    Qualificacao,
    Proposta,
    Negociacao,
    Fechado,
    Perdido,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Lead,
        StageId::Qualificacao,
        StageId::Proposta,
        StageId::Negociacao,
        StageId::Fechado,
        StageId::Perdido,
    ];

    /// Wire key used by the data service and the rendering layer
    pub fn key(&self) -> &'static str {
        match self {
            StageId::Lead => "lead",
            StageId::Qualificacao => "qualificacao",
            StageId::Proposta => "proposta",
            StageId::Negociacao => "negociacao",
            StageId::Fechado => "fechado",
            StageId::Perdido => "perdido",
        }
    }

    fn default_label(&self) -> &'static str {
        match self {
            StageId::Lead => "Lead",
            StageId::Qualificacao => "Qualificação",
            StageId::Proposta => "Proposta",
            StageId::Negociacao => "Negociação",
            StageId::Fechado => "Fechado",
            StageId::Perdido => "Perdido",
        }
    }

    fn default_color(&self) -> &'static str {
        match self {
            StageId::Lead => "#64748b",
            StageId::Qualificacao => "#3b82f6",
            StageId::Proposta => "#8b5cf6",
            StageId::Negociacao => "#f59e0b",
            StageId::Fechado => "#22c55e",
            StageId::Perdido => "#ef4444",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pipeline stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for StageId {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        StageId::ALL
            .iter()
            .copied()
            .find(|stage| stage.key() == key)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Deserialize an optional stage column, treating unknown keys as absent so a
/// single bad row never breaks the whole roster.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<StageId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(key) => match key.parse() {
            Ok(stage) => Ok(Some(stage)),
            Err(_) => {
                tracing::warn!(stage = %key, "Ignoring unknown pipeline stage in fetched row");
                Ok(None)
            }
        },
    }
}

/// Display metadata for one column. Presentation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageMeta {
    pub id: StageId,
    pub label: String,
    pub display_color: String,
}

/// Label/color override loaded from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOverride {
    pub label: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRegistry {
    stages: Vec<StageMeta>,
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self {
            stages: StageId::ALL
                .iter()
                .map(|id| StageMeta {
                    id: *id,
                    label: id.default_label().to_string(),
                    display_color: id.default_color().to_string(),
                })
                .collect(),
        }
    }
}

impl StageRegistry {
    /// Build the registry with display overrides keyed by stage key.
    /// The set and order of stages cannot be changed, only their metadata.
    pub fn with_overrides(overrides: &HashMap<String, StageOverride>) -> Result<Self, UnknownStage> {
        let mut registry = Self::default();
        for (key, stage_override) in overrides {
            let id: StageId = key.parse()?;
            let meta = registry
                .stages
                .iter_mut()
                .find(|meta| meta.id == id)
                .ok_or_else(|| UnknownStage(key.clone()))?;
            if let Some(label) = &stage_override.label {
                meta.label = label.clone();
            }
            if let Some(color) = &stage_override.color {
                meta.display_color = color.clone();
            }
        }
        Ok(registry)
    }

    /// Stage that receives clients without an assignment
    pub fn first(&self) -> StageId {
        self.stages.first().map(|meta| meta.id).unwrap_or(StageId::Lead)
    }

    pub fn ids(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages.iter().map(|meta| meta.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageMeta> {
        self.stages.iter()
    }

    pub fn meta(&self, id: StageId) -> Option<&StageMeta> {
        self.stages.iter().find(|meta| meta.id == id)
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.meta(id).is_some()
    }

    /// Resolve a column key coming from the rendering layer
    pub fn resolve(&self, key: &str) -> Result<StageId, UnknownStage> {
        let id: StageId = key.parse()?;
        if self.contains(id) {
            Ok(id)
        } else {
            Err(UnknownStage(key.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
