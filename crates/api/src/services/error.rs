use pharmacy_auth::AuthError;
use pharmacy_database::DatabaseError;
use pharmacy_integrations::IntegrationError;

use crate::ApiError;

#[derive(Debug)]
pub enum ServiceError {
    Validation(Vec<String>),
    NotFound(String),
    Database(DatabaseError),
    Auth(AuthError),
    Integration(IntegrationError),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(problems) => ApiError::validation(problems.join("; ")),
            ServiceError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            ServiceError::Database(error) => ApiError::from(error),
            ServiceError::Auth(error) => ApiError::from(error),
            ServiceError::Integration(error) => ApiError::from(error),
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        Self::Database(err)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::Query(err))
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<IntegrationError> for ServiceError {
    fn from(err: IntegrationError) -> Self {
        Self::Integration(err)
    }
}
