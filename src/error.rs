use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Outcome of processing an inbound event or dispatching a notification.
///
/// Listeners catch only `Transient` and re-throw it so the transport
/// redelivers; every other variant is recorded where applicable and acked.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Suppressed for recipient {person_id}")]
    Suppressed { person_id: String },

    #[error("Invalid message: {0}")]
    Validation(String),

    #[error("Provider failure: {0}")]
    Provider(String),

    #[error("Fatal: {0}")]
    Fatal(String),
}

impl DispatchError {
    /// Whether the enclosing queue message should be left for redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Transient(_))
    }
}

impl From<AppError> for DispatchError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::DatabaseError(m) => DispatchError::Transient(m),
            AppError::ValidationError(m) => DispatchError::Validation(m),
            AppError::NotFound(m) => DispatchError::Validation(m),
            AppError::UserNotFound(m) => DispatchError::Validation(m),
            AppError::UnknownTemplate(m) => DispatchError::Fatal(m),
            AppError::TemplateError(m) => DispatchError::Fatal(m),
            AppError::ConfigError(m) => DispatchError::Fatal(m),
            AppError::InternalServerError(m) => DispatchError::Transient(m),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
