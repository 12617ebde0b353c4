//! Conversions from external infrastructure errors into domain errors.

use ivy_domain::IvyError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub IvyError);

impl From<InfraError> for IvyError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<IvyError> for InfraError {
    fn from(value: IvyError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoIvyError {
    fn into_ivy(self) -> IvyError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → IvyError */
/* -------------------------------------------------------------------------- */

impl IntoIvyError for SqlError {
    fn into_ivy(self) -> IvyError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => IvyError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => IvyError::Storage("database is locked".into()),
                    ErrorCode::ReadOnly => IvyError::Storage("database is read-only".into()),
                    ErrorCode::CannotOpen => {
                        IvyError::Storage(format!("unable to open database: {message}"))
                    }
                    _ => IvyError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => IvyError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                IvyError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                IvyError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => {
                IvyError::Storage(format!("invalid database path: {}", path.to_string_lossy()))
            }
            other => IvyError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_ivy())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → IvyError */
/* -------------------------------------------------------------------------- */

impl IntoIvyError for HttpError {
    fn into_ivy(self) -> IvyError {
        if self.is_timeout() {
            return IvyError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return IvyError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return IvyError::Remote(format!("invalid response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => IvyError::NotFound(message),
                400..=499 => IvyError::Remote(message),
                _ => IvyError::Network(message),
            };
        }

        IvyError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_ivy())
    }
}

/* -------------------------------------------------------------------------- */
/* serde / io → IvyError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(IvyError::InvalidInput(format!("invalid JSON: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(IvyError::InvalidInput(format!("invalid TOML: {value}")))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        let ivy = match value.kind() {
            std::io::ErrorKind::NotFound => IvyError::NotFound(value.to_string()),
            _ => IvyError::Internal(format!("I/O error: {value}")),
        };
        InfraError(ivy)
    }
}

/// Convert any error with an `InfraError` mapping straight into `IvyError`.
pub(crate) fn to_ivy<E>(err: E) -> IvyError
where
    InfraError: From<E>,
{
    InfraError::from(err).0
}

/// Map JoinError from spawn_blocking to IvyError.
pub(crate) fn map_join_error(err: tokio::task::JoinError) -> IvyError {
    if err.is_cancelled() {
        IvyError::Internal("blocking task cancelled".into())
    } else {
        IvyError::Internal(format!("blocking task failed: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
