//! Sign-in orchestration
//!
//! `LoginOrchestrator::login` drives one complete sign-in attempt over one
//! exclusively-owned browser surface. Every step is a hard gate; errors
//! are logged and returned unmodified. Retry policy, if any, belongs to
//! the caller; this component never retries an account.

use crate::bing::verify_bing_login;
use crate::conflict::ParallelConflictGuard;
use crate::credentials::{CredentialEntry, SecretOutcome};
use crate::lockout::ensure_not_locked;
use crate::selectors::{PORTAL_HOST, PORTAL_MARKER, SIGNIN_URL};
use crate::two_factor::TwoFactorDispatcher;
use crate::util::pause;
use rp_browser::{
    BrowserSurface, CodeProvider, InteractionSimulator, PopupDismisser, SessionStore, Visibility,
};
use rp_config::BotConfig;
use rp_types::{AppError, AppResult, Credential};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Where a sign-in attempt currently stands. Owned by the orchestrator for
/// the duration of one `login` call and discarded with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Unauthenticated,
    CredentialsSubmitted,
    AwaitingVerification,
    Verified,
    Locked,
    Failed,
}

pub struct LoginOrchestrator {
    surface: Arc<dyn BrowserSurface>,
    input: Arc<dyn InteractionSimulator>,
    codes: Arc<dyn CodeProvider>,
    sessions: Arc<dyn SessionStore>,
    popups: Arc<dyn PopupDismisser>,
    config: BotConfig,
    cancel: CancellationToken,
}

impl LoginOrchestrator {
    pub fn new(
        surface: Arc<dyn BrowserSurface>,
        input: Arc<dyn InteractionSimulator>,
        codes: Arc<dyn CodeProvider>,
        sessions: Arc<dyn SessionStore>,
        popups: Arc<dyn PopupDismisser>,
        config: BotConfig,
    ) -> Self {
        Self {
            surface,
            input,
            codes,
            sessions,
            popups,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally-owned cancellation token, so a supervisor can
    /// abort a stuck attempt without killing the process.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one sign-in attempt and hand the resulting session to the store.
    pub async fn login(&self, credential: &Credential) -> AppResult<()> {
        let masked = credential.masked_identity();
        info!("starting sign-in for {}", masked);

        match self.run(credential).await {
            Ok(()) => {
                info!("signed in and saved the session for {}", masked);
                Ok(())
            }
            Err(e) => {
                let state = match e {
                    AppError::AccountLocked => LoginState::Locked,
                    _ => LoginState::Failed,
                };
                debug!("sign-in ended in state {:?}", state);
                error!("sign-in failed for {}: {}", masked, e);
                Err(e)
            }
        }
    }

    async fn run(&self, credential: &Credential) -> AppResult<()> {
        let login = &self.config.login;
        let mut state = LoginState::Unauthenticated;
        debug!("state {:?}", state);

        self.surface.navigate(SIGNIN_URL).await?;
        ensure_not_locked(self.surface.as_ref(), login, &self.cancel).await?;

        let already_signed_in = self
            .surface
            .locate(PORTAL_MARKER, login.portal_wait(), Visibility::Attached)
            .await
            .is_some();

        if already_signed_in {
            info!("already signed in");
            // Lockouts can surface on an authenticated portal too.
            ensure_not_locked(self.surface.as_ref(), login, &self.cancel).await?;
            state = LoginState::Verified;
        } else {
            let entry =
                CredentialEntry::new(self.surface.as_ref(), self.input.as_ref(), login, &self.cancel);

            entry.enter_identity(&credential.identity).await?;
            pause(login.settle(), &self.cancel).await?;
            let outcome = entry.enter_secret(&credential.secret).await?;
            state = LoginState::CredentialsSubmitted;
            debug!("credentials submitted, state {:?}", state);

            ensure_not_locked(self.surface.as_ref(), login, &self.cancel).await?;

            if outcome == SecretOutcome::ChallengePending {
                state = LoginState::AwaitingVerification;
                debug!("state {:?}", state);
                self.dispatcher().resolve().await?;
            }

            self.await_portal().await?;
            state = LoginState::Verified;
        }
        debug!("state {:?}", state);

        let bing_ok = verify_bing_login(
            self.surface.as_ref(),
            self.popups.as_ref(),
            login,
            &self.cancel,
        )
        .await?;
        if !bing_ok {
            warn!("continuing without Bing confirmation");
        }

        let snapshot = self.surface.snapshot().await?;
        self.sessions
            .save(&credential.identity, &snapshot, self.surface.is_mobile())
            .await?;
        Ok(())
    }

    fn dispatcher(&self) -> TwoFactorDispatcher {
        let guard = ParallelConflictGuard::new(self.config.parallel, &self.config.two_factor);
        TwoFactorDispatcher::new(
            self.surface.clone(),
            self.input.clone(),
            self.codes.clone(),
            guard,
            self.config.two_factor.clone(),
            self.cancel.clone(),
        )
    }

    /// Wait to land on the portal after credential submission, dismissing
    /// the sign-in interstitials that stand in the way. Bounded: when the
    /// rounds run out, the final marker probe decides.
    async fn await_portal(&self) -> AppResult<()> {
        let login = &self.config.login;

        for _ in 0..login.portal_arrival_rounds {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            self.popups.dismiss_known(self.surface.as_ref()).await;

            let current = self.surface.current_url().await;
            if at_portal_root(&current) {
                break;
            }
            pause(login.retry_pause(), &self.cancel).await?;
        }

        let arrived = self
            .surface
            .locate(PORTAL_MARKER, login.portal_wait(), Visibility::Attached)
            .await
            .is_some();
        if !arrived {
            return Err(AppError::Browser(
                "rewards portal marker not found after sign-in".to_string(),
            ));
        }
        info!("arrived on the rewards portal");
        Ok(())
    }
}

fn at_portal_root(current: &str) -> bool {
    Url::parse(current)
        .map(|url| url.host_str() == Some(PORTAL_HOST) && url.path() == "/")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_portal_root() {
        assert!(at_portal_root("https://rewards.bing.com/"));
        assert!(!at_portal_root("https://rewards.bing.com/signin"));
        assert!(!at_portal_root("https://login.live.com/"));
        assert!(!at_portal_root("not a url"));
    }
}
