use thiserror::Error;

/// Errors surfaced by world mutation calls. Construction-time failures
/// leave the world unchanged.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A parameter is outside its valid range: non-positive dynamic mass,
    /// non-positive step size, a joint connecting two static bodies.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A joint references a body id the world does not own.
    #[error("dangling reference: {0}")]
    DanglingReference(String),
}
