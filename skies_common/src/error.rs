use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkiesError>;

/// Everything that can go wrong between polling the feed and answering a search.
///
/// None of these are fatal to the polling loop: a failed poll leaves the map showing the last good
/// snapshot until the next one arrives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkiesError {
    /// The payload did not contain a readable `states` container
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Network or feed error while fetching a snapshot
    #[error("fetch failure: {0}")]
    FetchFailure(String),

    /// Search for a non-empty identifier that is not tracked
    #[error("{0} could not be found")]
    EntityNotFound(String),

    /// Auxiliary document store unreachable or unusable
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

macro_rules! malformed {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::error::SkiesError::MalformedSnapshot( format!( $fmt $(, $arg)* ))
    };
}
pub(crate) use malformed;
