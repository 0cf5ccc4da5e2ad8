//! Error classification and URL helpers shared by the repositories.

use diesel::result::DatabaseErrorKind;
use url::Url;

use super::pool::DieselError;

/// Wrap a non-Diesel failure as an opaque database error.
pub fn to_diesel_error(e: impl std::fmt::Display) -> DieselError {
    DieselError::DatabaseError(DatabaseErrorKind::Unknown, Box::new(e.to_string()))
}

/// Wrap a failure to reach the database. These are retried after reconnecting.
pub fn to_connection_error(e: impl std::fmt::Display) -> DieselError {
    DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, Box::new(e.to_string()))
}

pub fn is_connection_error(e: &DieselError) -> bool {
    match e {
        DieselError::DatabaseError(kind, _) => matches!(
            kind,
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand
        ),
        DieselError::BrokenTransactionManager => true,
        _ => false,
    }
}

pub fn is_postgres_url(url: &str) -> bool {
    ["postgres://", "postgresql://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Mask the password of a PostgreSQL URL for logs and status output.
pub fn redact_url_password(url: &str) -> String {
    if !is_postgres_url(url) {
        return url.to_string();
    }
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_err() {
                return url.to_string();
            }
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
