//! Authorization-code polling and token exchange
//!
//! The flow navigates the surface to the authorization endpoint and polls
//! its URL until the provider bounces back to the fixed desktop redirect
//! carrying a `code` parameter. The code is then exchanged exactly once.
//! The account may hit a verification interrupt mid-flow; that is handed
//! to the challenge resolver inline, and polling continues regardless of
//! the outcome unless configured to abort.

use crate::authorize::{build_authorization_url, generate_state_nonce, OAuthEndpoints};
use crate::http::HttpClient;
use async_trait::async_trait;
use rp_auth::TwoFactorDispatcher;
use rp_browser::BrowserSurface;
use rp_config::OAuthConfig;
use rp_types::{AppError, AppResult, OAuthTimeoutReason};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// URL fragments that mean the provider parked us on a verification page
/// while polling.
const INTERRUPT_MARKERS: &[&str] = &["passkey", "interrupt"];

/// At deadline time, these additionally classify the timeout as
/// challenge-related rather than generic.
const TIMEOUT_CHALLENGE_MARKERS: &[&str] = &["passkey", "interrupt", "proofs"];

/// Something that can clear a verification challenge on the surface.
#[async_trait]
pub trait ChallengeResolver: Send + Sync {
    async fn resolve(&self) -> AppResult<()>;
}

#[async_trait]
impl ChallengeResolver for TwoFactorDispatcher {
    async fn resolve(&self) -> AppResult<()> {
        TwoFactorDispatcher::resolve(self).await
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Redirect target parsed once up front.
struct RedirectTarget {
    host: String,
    path: String,
}

impl RedirectTarget {
    fn parse(redirect_url: &str) -> AppResult<Self> {
        let url = Url::parse(redirect_url)
            .map_err(|e| AppError::Config(format!("invalid redirect URL: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::Config("redirect URL has no host".to_string()))?
            .to_string();
        Ok(Self {
            host,
            path: url.path().to_string(),
        })
    }

    /// The `code` parameter, when `current` is the redirect.
    fn extract_code(&self, current: &str) -> Option<String> {
        let url = Url::parse(current).ok()?;
        if url.host_str() != Some(self.host.as_str()) || url.path() != self.path {
            return None;
        }
        url.query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
    }
}

pub struct AccessTokenFlow {
    surface: Arc<dyn BrowserSurface>,
    http: Arc<dyn HttpClient>,
    resolver: Arc<dyn ChallengeResolver>,
    endpoints: OAuthEndpoints,
    config: OAuthConfig,
    cancel: CancellationToken,
}

impl AccessTokenFlow {
    pub fn new(
        surface: Arc<dyn BrowserSurface>,
        http: Arc<dyn HttpClient>,
        resolver: Arc<dyn ChallengeResolver>,
        config: OAuthConfig,
    ) -> Self {
        Self {
            surface,
            http,
            resolver,
            endpoints: OAuthEndpoints::default(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: OAuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Acquire a bearer token for the account.
    pub async fn acquire(&self, identity: &str) -> AppResult<String> {
        let state = generate_state_nonce();
        let authorize = build_authorization_url(&self.endpoints, identity, &state);

        self.surface.navigate(&authorize).await?;
        info!("waiting for authorization");

        let code = self.poll_for_code().await?;
        self.exchange_code(&code).await
    }

    /// Poll the surface URL until the redirect carries an authorization
    /// code. Bounded by the configured deadline; terminates within one
    /// poll interval past it no matter what the page does.
    async fn poll_for_code(&self) -> AppResult<String> {
        let redirect = RedirectTarget::parse(&self.endpoints.redirect_url)?;
        let deadline = Instant::now() + self.config.authorization_timeout();

        loop {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let current = self.surface.current_url().await;
            if let Some(code) = redirect.extract_code(&current) {
                info!("authorization code received");
                return Ok(code);
            }

            if Instant::now() >= deadline {
                warn!(
                    "authorization did not complete within {:.0}s (last page: {})",
                    self.config.authorization_timeout().as_secs_f64(),
                    current
                );
                return Err(AppError::OAuthTimeout {
                    reason: timeout_reason(&current),
                });
            }

            if is_interrupt(&current) {
                info!("verification challenge is interrupting authorization");
                if let Err(e) = self.resolver.resolve().await {
                    // Deliberately swallowed by default: the interrupt can
                    // clear itself (another instance finishes the
                    // challenge, or the provider re-redirects).
                    warn!("challenge handling failed during authorization poll: {}", e);
                    if self.config.abort_on_challenge_failure {
                        return Err(e);
                    }
                }
            }

            self.pause(self.config.poll_interval()).await?;
        }
    }

    /// One POST per acquired code.
    async fn exchange_code(&self, code: &str) -> AppResult<String> {
        debug!("exchanging authorization code");
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.endpoints.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.endpoints.redirect_url.as_str()),
        ];

        let response = self.http.post_form(&self.endpoints.token_url, &params).await?;
        if !response.is_success() {
            error!(
                "token exchange failed with status {}: {}",
                response.status, response.body
            );
            return Err(AppError::TokenExchange {
                status: response.status,
                body: response.body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&response.body)?;
        info!("access token acquired");
        Ok(token.access_token)
    }

    async fn pause(&self, duration: Duration) -> AppResult<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

fn is_interrupt(current: &str) -> bool {
    INTERRUPT_MARKERS.iter().any(|m| current.contains(m))
}

fn timeout_reason(current: &str) -> OAuthTimeoutReason {
    if TIMEOUT_CHALLENGE_MARKERS.iter().any(|m| current.contains(m)) {
        OAuthTimeoutReason::TwoFactorRequired
    } else {
        OAuthTimeoutReason::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use rp_auth::ParallelConflictGuard;
    use rp_browser::{DirectInteraction, ScriptedSurface};
    use rp_config::TwoFactorConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const AUTHORIZE_PAGE: &str = "https://login.live.com/oauth20_authorize.srf?response_type=code";
    const REDIRECT_WITH_CODE: &str =
        "https://login.live.com/oauth20_desktop.srf?code=M.R3_BAY.abc123&state=feedc0de";
    const INTERRUPT_PAGE: &str = "https://login.live.com/interrupt/proofs";

    struct MockHttp {
        calls: AtomicUsize,
        bodies: Mutex<Vec<String>>,
        response: HttpResponse,
    }

    impl MockHttp {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
                response: HttpResponse {
                    status: 200,
                    body: r#"{"access_token":"bearer-token"}"#.to_string(),
                },
            }
        }

        fn error(status: u16, body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
                response: HttpResponse {
                    status,
                    body: body.to_string(),
                },
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpClient for MockHttp {
        async fn post_form(&self, _url: &str, params: &[(&str, &str)]) -> AppResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let encoded = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            self.bodies.lock().unwrap().push(encoded);
            Ok(self.response.clone())
        }
    }

    struct MockResolver {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockResolver {
        fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChallengeResolver for MockResolver {
        async fn resolve(&self) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::UnsupportedTwoFactorMethod(
                    "mock challenge".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }

    fn fast_config() -> OAuthConfig {
        OAuthConfig {
            poll_interval_ms: 2,
            authorization_timeout_ms: 100,
            abort_on_challenge_failure: false,
        }
    }

    fn flow(
        surface: Arc<ScriptedSurface>,
        http: Arc<MockHttp>,
        resolver: Arc<MockResolver>,
        config: OAuthConfig,
    ) -> AccessTokenFlow {
        AccessTokenFlow::new(surface, http, resolver, config)
    }

    #[tokio::test]
    async fn test_acquire_exchanges_the_code_exactly_once() {
        let surface = Arc::new(ScriptedSurface::desktop());
        // The redirect is observed on consecutive polls; the code must
        // still be posted only once.
        surface.stage_urls([REDIRECT_WITH_CODE, REDIRECT_WITH_CODE]);
        let http = Arc::new(MockHttp::ok());
        let resolver = Arc::new(MockResolver::succeeding());

        let token = flow(surface.clone(), http.clone(), resolver.clone(), fast_config())
            .acquire("user@example.com")
            .await
            .unwrap();

        assert_eq!(token, "bearer-token");
        assert_eq!(http.call_count(), 1);
        assert_eq!(resolver.call_count(), 0);

        let body = http.bodies.lock().unwrap().first().unwrap().clone();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=M.R3_BAY.abc123"));
        assert!(body.contains("client_id=0000000040170455"));

        // The browser went to the authorization endpoint with the hint.
        let navigations = surface.navigations();
        assert!(navigations[0].contains("login_hint=user%40example.com"));
    }

    #[tokio::test]
    async fn test_polling_times_out_within_the_deadline() {
        let surface = Arc::new(ScriptedSurface::desktop());
        surface.stage_urls([AUTHORIZE_PAGE]);
        let http = Arc::new(MockHttp::ok());
        let resolver = Arc::new(MockResolver::succeeding());

        let config = fast_config();
        let bound = config.authorization_timeout() + Duration::from_millis(500);

        let start = Instant::now();
        let err = flow(surface, http.clone(), resolver, config)
            .acquire("user@example.com")
            .await
            .unwrap_err();

        assert!(start.elapsed() < bound, "poll overran: {:?}", start.elapsed());
        assert!(matches!(
            err,
            AppError::OAuthTimeout {
                reason: OAuthTimeoutReason::Generic
            }
        ));
        assert_eq!(http.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_on_a_verification_page_says_so() {
        let surface = Arc::new(ScriptedSurface::desktop());
        // "proofs" pages classify the timeout but are not poll interrupts.
        surface.stage_urls(["https://account.live.com/proofs/Add"]);
        let http = Arc::new(MockHttp::ok());
        let resolver = Arc::new(MockResolver::succeeding());

        let err = flow(surface, http, resolver.clone(), fast_config())
            .acquire("user@example.com")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::OAuthTimeout {
                reason: OAuthTimeoutReason::TwoFactorRequired
            }
        ));
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_challenge_failure_mid_poll_is_swallowed_by_default() {
        let surface = Arc::new(ScriptedSurface::desktop());
        surface.stage_urls([INTERRUPT_PAGE, REDIRECT_WITH_CODE]);
        let http = Arc::new(MockHttp::ok());
        let resolver = Arc::new(MockResolver::failing());

        let token = flow(surface, http.clone(), resolver.clone(), fast_config())
            .acquire("user@example.com")
            .await
            .unwrap();

        assert_eq!(token, "bearer-token");
        assert_eq!(resolver.call_count(), 1);
        assert_eq!(http.call_count(), 1);
    }

    #[tokio::test]
    async fn test_challenge_failure_aborts_when_configured() {
        let surface = Arc::new(ScriptedSurface::desktop());
        surface.stage_urls([INTERRUPT_PAGE]);
        let http = Arc::new(MockHttp::ok());
        let resolver = Arc::new(MockResolver::failing());

        let mut config = fast_config();
        config.abort_on_challenge_failure = true;

        let err = flow(surface, http.clone(), resolver, config)
            .acquire("user@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedTwoFactorMethod(_)));
        assert_eq!(http.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_endpoint_rejection_is_typed() {
        let surface = Arc::new(ScriptedSurface::desktop());
        surface.stage_urls([REDIRECT_WITH_CODE]);
        let http = Arc::new(MockHttp::error(400, r#"{"error":"invalid_grant"}"#));
        let resolver = Arc::new(MockResolver::succeeding());

        let err = flow(surface, http, resolver, fast_config())
            .acquire("user@example.com")
            .await
            .unwrap_err();

        match err {
            AppError::TokenExchange { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_polling() {
        let surface = Arc::new(ScriptedSurface::desktop());
        surface.stage_urls([AUTHORIZE_PAGE]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = flow(
            surface,
            Arc::new(MockHttp::ok()),
            Arc::new(MockResolver::succeeding()),
            fast_config(),
        )
        .with_cancellation(cancel)
        .acquire("user@example.com")
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_real_dispatcher_short_circuits_during_poll() {
        let surface = Arc::new(ScriptedSurface::desktop());
        // Another instance finished the challenge: the signed-in marker is
        // present, so the dispatcher resolves without prompting anyone,
        // and a later poll sees the redirect.
        surface.present("html[data-role-name=\"RewardsPortal\"]");
        surface.stage_urls([INTERRUPT_PAGE, INTERRUPT_PAGE, REDIRECT_WITH_CODE]);
        let http = Arc::new(MockHttp::ok());

        let two_factor = TwoFactorConfig {
            settle_ms: 1,
            probe_wait_ms: 1,
            jitter_min_ms: 1,
            jitter_max_ms: 2,
            ..TwoFactorConfig::default()
        };
        let dispatcher: Arc<dyn ChallengeResolver> = Arc::new(TwoFactorDispatcher::new(
            surface.clone(),
            Arc::new(DirectInteraction),
            Arc::new(NoCodes),
            ParallelConflictGuard::new(true, &two_factor),
            two_factor,
            CancellationToken::new(),
        ));

        let token = AccessTokenFlow::new(surface, http.clone(), dispatcher, fast_config())
            .acquire("user@example.com")
            .await
            .unwrap();

        assert_eq!(token, "bearer-token");
        assert_eq!(http.call_count(), 1);
    }

    struct NoCodes;

    #[async_trait]
    impl rp_browser::CodeProvider for NoCodes {
        async fn prompt_for_code(&self, _prompt: &str) -> AppResult<String> {
            Err(AppError::Browser("no code should be requested".to_string()))
        }
    }
}
