//! Mapping of adapter-native failures onto the domain error taxonomy.

use chime_domain::ChimeError;
use rusqlite::ErrorCode;

/// Map a rusqlite failure onto the store taxonomy.
///
/// Busy/locked conditions become `StoreBusy` so callers can treat them as
/// transient; corruption is surfaced distinctly; a missing row is
/// `NotFound`; constraint failures keep their message.
pub fn map_sqlite_error(err: rusqlite::Error) -> ChimeError {
    match &err {
        rusqlite::Error::QueryReturnedNoRows => ChimeError::NotFound("no matching row".into()),
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                ChimeError::StoreBusy(err.to_string())
            }
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                ChimeError::StoreCorrupted(err.to_string())
            }
            ErrorCode::ConstraintViolation => ChimeError::ConstraintViolation(err.to_string()),
            _ => ChimeError::StoreUnavailable(err.to_string()),
        },
        _ => ChimeError::StoreUnavailable(err.to_string()),
    }
}

/// Pool acquisition failures mean the store is not reachable right now.
pub fn map_pool_error(err: r2d2::Error) -> ChimeError {
    ChimeError::StoreUnavailable(err.to_string())
}

/// A blocking task that died mid-write is an unexpected runtime fault.
pub fn map_join_error(err: tokio::task::JoinError) -> ChimeError {
    ChimeError::Unexpected(err.to_string())
}
