use thiserror::Error;

pub type BootstrapResult<T> = Result<T, BootstrapError>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to spawn worker {index}: {reason}")]
    Spawn { index: usize, reason: String },

    #[error("failed to deliver init message to worker {index}: {reason}")]
    Post { index: usize, reason: String },

    #[error("module instantiation failed: {reason}")]
    Instantiate { reason: String },

    #[error("failed to fetch worker script: {0}")]
    ScriptFetch(String),

    #[error("message channel closed before the expected message arrived")]
    ChannelClosed,

    #[error("expected {expected} object senders, got {actual}")]
    SenderCountMismatch { expected: usize, actual: usize },

    #[error("invalid bootstrap configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("worker {index} never signaled readiness{}", render_cause(.cause))]
    WorkerBootstrapTimeout {
        index: usize,
        cause: Option<String>,
    },
}

impl BootstrapError {
    pub fn spawn(index: usize, reason: impl Into<String>) -> Self {
        BootstrapError::Spawn {
            index,
            reason: reason.into(),
        }
    }

    pub fn post(index: usize, reason: impl Into<String>) -> Self {
        BootstrapError::Post {
            index,
            reason: reason.into(),
        }
    }

    pub fn instantiate(reason: impl Into<String>) -> Self {
        BootstrapError::Instantiate {
            reason: reason.into(),
        }
    }

    pub fn script_fetch(reason: impl Into<String>) -> Self {
        BootstrapError::ScriptFetch(reason.into())
    }
}

fn render_cause(cause: &Option<String>) -> String {
    match cause {
        Some(cause) => format!(" ({cause})"),
        None => String::new(),
    }
}
