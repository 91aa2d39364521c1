//! Error types and conversions

use thiserror::Error;

/// Why an OAuth authorization attempt ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthTimeoutReason {
    /// No matching redirect was ever observed.
    Generic,
    /// The last observed page was a verification interrupt; the account
    /// needs a challenge completed before authorization can finish.
    TwoFactorRequired,
}

impl std::fmt::Display for OAuthTimeoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OAuthTimeoutReason::Generic => write!(f, "user interaction required"),
            OAuthTimeoutReason::TwoFactorRequired => write!(f, "2FA verification required"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("account is locked by the identity provider; remove it from the account list and restart")]
    AccountLocked,

    #[error("no supported verification method detected: {0}")]
    UnsupportedTwoFactorMethod(String),

    #[error("sign-in was not approved after {attempts} attempts")]
    VerificationExhausted { attempts: u32 },

    #[error("OAuth authorization timed out: {reason}")]
    OAuthTimeout { reason: OAuthTimeoutReason },

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("session store error: {0}")]
    Session(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reason_display() {
        let generic = AppError::OAuthTimeout {
            reason: OAuthTimeoutReason::Generic,
        };
        let two_factor = AppError::OAuthTimeout {
            reason: OAuthTimeoutReason::TwoFactorRequired,
        };

        assert!(generic.to_string().contains("user interaction required"));
        assert!(two_factor.to_string().contains("2FA verification required"));
    }

    #[test]
    fn test_token_exchange_display_carries_status_and_body() {
        let err = AppError::TokenExchange {
            status: 400,
            body: "invalid_grant".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("invalid_grant"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
