//! Configuration types
//!
//! Every wait in the sign-in and authorization flows carries an explicit
//! bound, and every bound lives here so deployments can tune them. Values
//! are stored as plain milliseconds/counters for readable JSON; code reads
//! them through the `Duration` accessors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    /// Multiple instances may run against the same account (desktop +
    /// mobile). Enables the advisory conflict guard around verification
    /// challenges.
    #[serde(default)]
    pub parallel: bool,

    /// Directory session snapshots are written under.
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,

    #[serde(default)]
    pub login: LoginConfig,

    #[serde(default)]
    pub two_factor: TwoFactorConfig,

    #[serde(default)]
    pub oauth: OAuthConfig,
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            session_dir: default_session_dir(),
            login: LoginConfig::default(),
            two_factor: TwoFactorConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
}

/// Bounds for the sign-in flow itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginConfig {
    /// Fixed settle delay between sign-in steps.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Visible wait for the account-lock banner. Kept short so the common
    /// unlocked case adds no noticeable latency.
    #[serde(default = "default_lock_probe_ms")]
    pub lock_probe_ms: u64,

    /// Wait for the authenticated-portal marker after navigation.
    #[serde(default = "default_portal_wait_ms")]
    pub portal_wait_ms: u64,

    /// Wait for the identity input and submission controls.
    #[serde(default = "default_field_wait_ms")]
    pub field_wait_ms: u64,

    /// Wait for the provider's prefilled-identity indicator.
    #[serde(default = "default_prefill_wait_ms")]
    pub prefill_wait_ms: u64,

    /// Wait for the secret input. Longer than the identity wait because its
    /// absence is meaningful (a verification challenge is pending).
    #[serde(default = "default_secret_wait_ms")]
    pub secret_wait_ms: u64,

    /// Rounds of dismiss-and-check while waiting to arrive on the portal.
    #[serde(default = "default_portal_arrival_rounds")]
    pub portal_arrival_rounds: u32,

    /// Pause between those rounds (also used by the Bing verifier).
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,

    /// Iteration budget for the Bing login verifier.
    #[serde(default = "default_verify_rounds")]
    pub verify_rounds: u32,

    /// Wait for the Bing login-confirmed marker.
    #[serde(default = "default_bing_probe_ms")]
    pub bing_probe_ms: u64,
}

fn default_settle_ms() -> u64 {
    2_000
}
fn default_lock_probe_ms() -> u64 {
    1_000
}
fn default_portal_wait_ms() -> u64 {
    10_000
}
fn default_field_wait_ms() -> u64 {
    2_000
}
fn default_prefill_wait_ms() -> u64 {
    5_000
}
fn default_secret_wait_ms() -> u64 {
    5_000
}
fn default_portal_arrival_rounds() -> u32 {
    30
}
fn default_retry_pause_ms() -> u64 {
    1_000
}
fn default_verify_rounds() -> u32 {
    5
}
fn default_bing_probe_ms() -> u64 {
    5_000
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            lock_probe_ms: default_lock_probe_ms(),
            portal_wait_ms: default_portal_wait_ms(),
            field_wait_ms: default_field_wait_ms(),
            prefill_wait_ms: default_prefill_wait_ms(),
            secret_wait_ms: default_secret_wait_ms(),
            portal_arrival_rounds: default_portal_arrival_rounds(),
            retry_pause_ms: default_retry_pause_ms(),
            verify_rounds: default_verify_rounds(),
            bing_probe_ms: default_bing_probe_ms(),
        }
    }
}

impl LoginConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn lock_probe(&self) -> Duration {
        Duration::from_millis(self.lock_probe_ms)
    }
    pub fn portal_wait(&self) -> Duration {
        Duration::from_millis(self.portal_wait_ms)
    }
    pub fn field_wait(&self) -> Duration {
        Duration::from_millis(self.field_wait_ms)
    }
    pub fn prefill_wait(&self) -> Duration {
        Duration::from_millis(self.prefill_wait_ms)
    }
    pub fn secret_wait(&self) -> Duration {
        Duration::from_millis(self.secret_wait_ms)
    }
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
    pub fn bing_probe(&self) -> Duration {
        Duration::from_millis(self.bing_probe_ms)
    }
}

/// Bounds for verification-challenge handling.
///
/// The approval retry and the conflict-resend wait were unbounded loops in
/// earlier revisions; both are capped here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TwoFactorConfig {
    /// Settle delay before method detection starts.
    #[serde(default = "default_challenge_settle_ms")]
    pub settle_ms: u64,

    /// Per-selector probe bound during method detection.
    #[serde(default = "default_probe_wait_ms")]
    pub probe_wait_ms: u64,

    /// Wait for the approval form to disappear after an authenticator
    /// number is displayed.
    #[serde(default = "default_approval_wait_ms")]
    pub approval_wait_ms: u64,

    /// Replacement-code retries before giving up on authenticator approval.
    #[serde(default = "default_max_approval_attempts")]
    pub max_approval_attempts: u32,

    /// Overall deadline across all approval attempts.
    #[serde(default = "default_approval_deadline_ms")]
    pub approval_deadline_ms: u64,

    /// Base for the randomized backoff between approval attempts.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Advisory jitter window applied before requesting a challenge when
    /// `parallel` is set. Uniform draw in [min, max].
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Detection rounds before the challenge is declared unsupported.
    #[serde(default = "default_detection_rounds")]
    pub detection_rounds: u32,

    /// Delay before re-requesting a code after a cross-instance collision
    /// (the provider accepts one pending challenge per account).
    #[serde(default = "default_conflict_retry_delay_ms")]
    pub conflict_retry_delay_ms: u64,

    /// Wait-then-resend rounds after such a collision.
    #[serde(default = "default_max_conflict_waits")]
    pub max_conflict_waits: u32,
}

fn default_challenge_settle_ms() -> u64 {
    3_000
}
fn default_probe_wait_ms() -> u64 {
    3_000
}
fn default_approval_wait_ms() -> u64 {
    60_000
}
fn default_max_approval_attempts() -> u32 {
    5
}
fn default_approval_deadline_ms() -> u64 {
    360_000
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_jitter_min_ms() -> u64 {
    5_000
}
fn default_jitter_max_ms() -> u64 {
    15_000
}
fn default_detection_rounds() -> u32 {
    3
}
fn default_conflict_retry_delay_ms() -> u64 {
    60_000
}
fn default_max_conflict_waits() -> u32 {
    3
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_challenge_settle_ms(),
            probe_wait_ms: default_probe_wait_ms(),
            approval_wait_ms: default_approval_wait_ms(),
            max_approval_attempts: default_max_approval_attempts(),
            approval_deadline_ms: default_approval_deadline_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            detection_rounds: default_detection_rounds(),
            conflict_retry_delay_ms: default_conflict_retry_delay_ms(),
            max_conflict_waits: default_max_conflict_waits(),
        }
    }
}

impl TwoFactorConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn probe_wait(&self) -> Duration {
        Duration::from_millis(self.probe_wait_ms)
    }
    pub fn approval_wait(&self) -> Duration {
        Duration::from_millis(self.approval_wait_ms)
    }
    pub fn approval_deadline(&self) -> Duration {
        Duration::from_millis(self.approval_deadline_ms)
    }
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
    pub fn jitter_min(&self) -> Duration {
        Duration::from_millis(self.jitter_min_ms)
    }
    pub fn jitter_max(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }
    pub fn conflict_retry_delay(&self) -> Duration {
        Duration::from_millis(self.conflict_retry_delay_ms)
    }
}

/// Bounds and behavior for the OAuth authorization-code flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Interval between redirect-URL polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Overall deadline for the authorization redirect.
    #[serde(default = "default_authorization_timeout_ms")]
    pub authorization_timeout_ms: u64,

    /// When a verification challenge interrupts polling and its handling
    /// fails, abort instead of continuing to poll. Off by default: the
    /// interrupt can resolve itself (another instance completes the
    /// challenge), and the failure is logged loudly either way.
    #[serde(default)]
    pub abort_on_challenge_failure: bool,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_authorization_timeout_ms() -> u64 {
    120_000
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            authorization_timeout_ms: default_authorization_timeout_ms(),
            abort_on_challenge_failure: false,
        }
    }
}

impl OAuthConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.authorization_timeout_ms)
    }
}
