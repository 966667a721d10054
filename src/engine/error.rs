use ulid::Ulid;

#[derive(Debug)]
pub enum EngineError {
    /// Degenerate input that should have been rejected by the caller.
    /// Never reported as a scheduling conflict.
    InvalidRequest(&'static str),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    LimitExceeded(&'static str),
    /// Another booking was admitted for this resource first. The caller
    /// must re-evaluate, not retry the stale decision.
    ConcurrentCommitConflict { resource_id: Ulid },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::ConcurrentCommitConflict { resource_id } => {
                write!(f, "timeline for {resource_id} changed since evaluation; re-evaluate")
            }
        }
    }
}

impl std::error::Error for EngineError {}
