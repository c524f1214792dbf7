//! Error hierarchy for the route event-stream service
//!
//! Errors are grouped by the collaborator that raises them. None of them is
//! fatal to the process: everything raised inside a subscription is scoped
//! to that subscription and ends as a [`crate::StreamTermination`].

use config::ConfigError;

use crate::ChangeKind;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings could not be loaded or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Settings were loaded but break a validation rule
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Authorization gate rejected the caller
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Store watch could not be opened or died
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Change notification could not be mapped to a wire event
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Process-level failures (IO, signals, server start)
    #[error(transparent)]
    System(#[from] SystemError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token does not grant the required scope: {required}")]
    InsufficientScope { required: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Failure reported by the store driver
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Watcher could not keep up with the change rate and was dropped
    #[error("Watcher {watcher_id} fell behind the change stream")]
    Lagged { watcher_id: u64 },

    /// Store is no longer accepting watchers
    #[error("Store watch closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("Invalid change notification")]
    InvalidKind,

    #[error("Unrecognized change kind code {0}")]
    UnrecognizedKind(u8),

    #[error("{kind:?} notification carries no payload")]
    MissingPayload { kind: ChangeKind },
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    SignalSenderClosed(String),

    #[error("Server failed to start: {0}")]
    ServerStartFailed(String),
}
