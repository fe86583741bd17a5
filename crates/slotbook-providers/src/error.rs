//! Error types for calendar capability operations.
//!
//! Every failure from a calendar backend is reported as a [`ProviderError`]
//! with a machine-readable [`ProviderErrorCode`], so the engine can
//! distinguish "availability temporarily unknown" from "no conflicts found"
//! and never treats an upstream failure as a free calendar.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No valid credential could be produced for the calendar connection.
    CredentialUnavailable,
    /// The provider could not be reached: connection failure, DNS, etc.
    ProviderUnreachable,
    /// The request timed out. For event inserts this is ambiguous: the
    /// event may or may not exist upstream.
    Timeout,
    /// Rate limit exceeded.
    RateLimited,
    /// The provider returned a server error (5xx).
    ServerError,
    /// The provider's response could not be parsed.
    InvalidResponse,
    /// Calendar or resource not found (404).
    NotFound,
    /// The request was rejected as invalid (400).
    BadRequest,
    /// The provider reported a calendar-level failure (e.g. a per-calendar
    /// error entry in a free/busy response).
    ProviderFault,
}

impl ProviderErrorCode {
    /// Returns true if the operation may be retried safely.
    ///
    /// Timeouts are deliberately excluded: a timed-out event insert may have
    /// landed, so retrying risks a duplicate.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnreachable | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns the snake_case name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialUnavailable => "credential_unavailable",
            Self::ProviderUnreachable => "provider_unreachable",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ProviderFault => "provider_fault",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from a calendar capability operation.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The backend that produced the error (e.g. "google").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates a credential-unavailable error.
    pub fn credential_unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CredentialUnavailable, message)
    }

    /// Creates a provider-unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ProviderUnreachable, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    /// Creates a rate-limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a provider-fault error.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ProviderFault, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if the operation may be retried safely.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for capability operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
