use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

/// Required fields missing on a manual save.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Validation failed: {}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportFormatError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("Unreadable CSV: {0}")]
    Unreadable(String),

    #[error("Unknown item kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("Failed to fetch exchange rates: {0}")]
    RateFetch(String),

    #[error("No exchange rate available for {0}")]
    MissingRate(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    #[error("Invalid share link")]
    InvalidToken,

    #[error("This share link has been disabled")]
    Disabled,

    #[error("This share link has expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Persistence error: {0}")]
pub struct PersistenceError(pub String);

impl From<mongodb::error::Error> for PersistenceError {
    fn from(e: mongodb::error::Error) -> Self {
        PersistenceError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LegError {
    #[error("No leg with id {0}")]
    NotFound(String),

    #[error("Leg location must not be empty")]
    EmptyLocation,

    #[error("Another leg already uses location {0}")]
    DuplicateLocation(String),
}

/// Error surface of the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Import(#[from] ImportFormatError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Leg(#[from] LegError),

    #[error("Client {0} not found")]
    ClientNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Import(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Conversion(ConversionError::RateFetch(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Conversion(_) => StatusCode::BAD_REQUEST,
            ApiError::Access(_) => StatusCode::FORBIDDEN,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Selection(_) | ApiError::ClientNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Leg(LegError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Leg(LegError::EmptyLocation) => StatusCode::BAD_REQUEST,
            ApiError::Leg(LegError::DuplicateLocation(_)) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        }

        let body = match self {
            ApiError::Validation(e) => json!({ "error": "validation", "problems": e.problems }),
            ApiError::Import(ImportFormatError::MissingHeaders(missing)) => {
                json!({ "error": "import_format", "missing_columns": missing })
            }
            // Denials carry no document data.
            ApiError::Access(e) => json!({ "error": "access_denied", "reason": e.to_string() }),
            ApiError::Persistence(_) => json!({ "error": "Failed to save quote" }),
            other => json!({ "error": other.to_string() }),
        };

        HttpResponse::build(status).json(body)
    }
}
