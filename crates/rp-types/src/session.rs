//! Account credential and browser session snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sign-in credential for one account.
///
/// Both fields are opaque to the orchestrator and must never appear in log
/// output; `Debug` masks the identity and redacts the secret entirely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub identity: String,
    pub secret: String,
}

impl Credential {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Masked form of the identity, safe for log output.
    ///
    /// Keeps the first two characters and the domain: `ma***@example.com`.
    pub fn masked_identity(&self) -> String {
        mask_identity(&self.identity)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.masked_identity())
            .field("secret", &"***")
            .finish()
    }
}

/// Mask an account identity for log output.
pub fn mask_identity(identity: &str) -> String {
    let (local, domain) = match identity.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (identity, None),
    };

    let visible: String = local.chars().take(2).collect();
    match domain {
        Some(domain) => format!("{}***@{}", visible, domain),
        None => format!("{}***", visible),
    }
}

/// A single cookie captured from the browser context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix timestamp in seconds; absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

/// One local-storage key/value pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageItem {
    pub name: String,
    pub value: String,
}

/// Local-storage contents for a single origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageOrigin {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageItem>,
}

/// Snapshot of the browser storage state after a successful sign-in.
///
/// Written once per login through the session store; the orchestrator never
/// reads it back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
    #[serde(default)]
    pub origins: Vec<StorageOrigin>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }
}

/// A session snapshot together with the metadata needed to restore it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub saved_at: DateTime<Utc>,
    pub identity: String,
    /// "desktop" or "mobile"; the two surfaces keep separate sessions.
    pub surface: String,
    pub snapshot: SessionSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::new("mailbox@example.com", "hunter2");
        let debug = format!("{:?}", credential);

        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("mailbox@example.com"));
        assert!(debug.contains("ma***@example.com"));
    }

    #[test]
    fn test_mask_identity_variants() {
        assert_eq!(mask_identity("mailbox@example.com"), "ma***@example.com");
        assert_eq!(mask_identity("a@example.com"), "a***@example.com");
        assert_eq!(mask_identity("no-at-sign"), "no***");
        assert_eq!(mask_identity(""), "***");
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let snapshot = SessionSnapshot {
            cookies: vec![SessionCookie {
                name: "auth".to_string(),
                value: "token".to_string(),
                domain: ".example.com".to_string(),
                path: "/".to_string(),
                expires: Some(1_900_000_000),
                http_only: true,
                secure: true,
            }],
            origins: vec![StorageOrigin {
                origin: "https://example.com".to_string(),
                local_storage: vec![StorageItem {
                    name: "key".to_string(),
                    value: "value".to_string(),
                }],
            }],
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        // Cookie fields use the camelCase names the browser exports.
        assert!(json.contains("\"httpOnly\":true"));
        assert!(json.contains("\"localStorage\""));

        let restored: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_snapshot_default_is_empty() {
        assert!(SessionSnapshot::default().is_empty());
    }
}
