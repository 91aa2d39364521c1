//! OAuth authorization-code flow for the RewardsPilot mobile client
//!
//! Mobile activities authenticate with a bearer token instead of cookies.
//! `AccessTokenFlow` drives the provider's fixed desktop OAuth client
//! through the browser surface: authorize, poll for the redirect, exchange
//! the code once. Verification interrupts mid-flow reuse the two-factor
//! dispatcher from `rp-auth`.

pub mod authorize;
pub mod exchange;
pub mod http;

pub use authorize::{build_authorization_url, generate_state_nonce, OAuthEndpoints};
pub use exchange::{AccessTokenFlow, ChallengeResolver};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
