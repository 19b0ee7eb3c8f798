//! Service error types.

use thiserror::Error;

/// Status code of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    InvalidArgument,
    Unauthenticated,
    NotFound,
    Internal,
}

impl Code {
    /// Matching HTTP status for transports that speak HTTP.
    pub fn http_status(self) -> u16 {
        match self {
            Code::InvalidArgument => 400,
            Code::Unauthenticated => 401,
            Code::NotFound => 404,
            Code::Internal => 500,
        }
    }
}

/// A request failure carrying a client-facing message.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> Code {
        match self {
            ServiceError::InvalidArgument(_) => Code::InvalidArgument,
            ServiceError::Unauthenticated(_) => Code::Unauthenticated,
            ServiceError::NotFound(_) => Code::NotFound,
            ServiceError::Internal(_) => Code::Internal,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
