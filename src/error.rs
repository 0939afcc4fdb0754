//! Crate-wide error type.
//!
//! Four kinds, matching the taxonomy the service is specified against:
//! invalid input, numerical failure (Cholesky refuses even after jitter),
//! state errors (operating on a pair with no optimizer yet), and storage
//! errors from the durable-store adapter. Kept as a hand-rolled enum with
//! manual `Display`/`Debug` rather than a `thiserror` derive, in keeping
//! with this codebase's existing error type.

#[derive(Clone)]
pub enum BoError {
    InvalidInput(String),
    Numerical(String),
    State(String),
    Storage(String),
}

impl BoError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(m) | Self::Numerical(m) | Self::State(m) | Self::Storage(m) => m,
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid input",
            Self::Numerical(_) => "numerical error",
            Self::State(_) => "state error",
            Self::Storage(_) => "storage error",
        }
    }
}

impl std::fmt::Display for BoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind_label(), self.message())
    }
}

impl std::fmt::Debug for BoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoError")
            .field("kind", &self.kind_label())
            .field("message", &self.message())
            .finish()
    }
}

impl std::error::Error for BoError {}

pub type Result<T> = std::result::Result<T, BoError>;
