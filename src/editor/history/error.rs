use bevy::prelude::Entity;
use thiserror::Error;

/// Errors raised while capturing or restoring scene state
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot encode element {entity:?}: {reason}")]
    Encode { entity: Entity, reason: String },

    #[error("cannot decode element {id}: {reason}")]
    Decode { id: String, reason: String },

    #[error("element {0} is not in the scene")]
    LookupMiss(String),

    #[error("there are no {0} actions")]
    StackEmpty(&'static str),

    #[error("scene group {0} is not available")]
    MissingGroup(&'static str),

    #[error("restore failed: {0}")]
    Restore(String),
}
