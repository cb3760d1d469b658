//! Error types for the room layer.
//!
//! A missing room or player is not an error here: the dispatcher treats
//! both as silent no-ops. These variants cover bad configuration and
//! client input rejected at the boundary.

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room configuration cannot be used.
    #[error("invalid room config: {0}")]
    InvalidConfig(String),

    /// A client-supplied value was rejected before reaching room state.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
