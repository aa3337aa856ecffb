use async_graphql::ErrorExtensions;
use library::CatalogError;

pub const TRACK_NOT_FOUND: &str = "TRACK_NOT_FOUND";
pub const DELETE_FAILED: &str = "DELETE_FAILED";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

#[derive(Debug)]
pub enum ServiceError {
    TrackNotFound(String),
    Validation(String),
    Catalog(CatalogError),
    Task(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::TrackNotFound(_) => TRACK_NOT_FOUND,
            ServiceError::Validation(_) => VALIDATION_ERROR,
            ServiceError::Catalog(_) | ServiceError::Task(_) => INTERNAL_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.code() == INTERNAL_ERROR
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::TrackNotFound(id) => write!(f, "Track with id {} not found", id),
            ServiceError::Validation(message) => write!(f, "{}", message),
            ServiceError::Catalog(err) => write!(f, "storage error: {}", err),
            ServiceError::Task(message) => write!(f, "task error: {}", message),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Catalog(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        ServiceError::Catalog(err)
    }
}

impl ErrorExtensions for ServiceError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}
