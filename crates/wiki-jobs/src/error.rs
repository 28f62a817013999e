use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("queue {0:?} is already registered")]
    AlreadyRegistered(String),

    #[error("no such queue: {0:?}")]
    NoSuchQueue(String),

    #[error("queue {0:?} is no longer accepting jobs")]
    QueueClosed(String),
}
