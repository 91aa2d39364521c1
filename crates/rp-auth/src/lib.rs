//! Sign-in orchestration and verification-challenge handling
//!
//! One `LoginOrchestrator` owns one browser surface for one sign-in
//! attempt: navigate, enter credentials, clear whatever verification
//! challenge the provider raises, confirm the companion Bing session, and
//! hand the session snapshot to the store. The two-factor dispatcher is
//! also used on its own by the OAuth authorization flow.

pub mod bing;
pub mod conflict;
pub mod credentials;
pub mod lockout;
pub mod login;
mod selectors;
pub mod two_factor;
mod util;

pub use bing::verify_bing_login;
pub use conflict::ParallelConflictGuard;
pub use credentials::{CredentialEntry, SecretOutcome};
pub use lockout::ensure_not_locked;
pub use login::{LoginOrchestrator, LoginState};
pub use two_factor::{ChallengeKind, TwoFactorDispatcher, VerificationChallenge};
