//! Credential entry phase
//!
//! Both steps tolerate missing elements: the provider reorders its sign-in
//! screens often enough that a failed lookup is logged and the flow
//! continues, relying on the later portal check to catch real failures.

use crate::selectors::{
    IDENTITY_INPUT, IDENTITY_PREFILL, PASSWORDLESS_FOOTER, PASSWORDLESS_METHOD_ITEM,
    PASSWORDLESS_OTHER_WAYS, SECRET_INPUT, SUBMIT_BUTTON,
};
use crate::util::pause;
use rp_browser::{BrowserSurface, InteractionSimulator, Visibility};
use rp_config::LoginConfig;
use rp_types::AppResult;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How the secret step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOutcome {
    /// The secret was entered and submitted.
    Submitted,
    /// No secret field appeared; the provider is asking for a verification
    /// challenge instead, and the caller should dispatch it.
    ChallengePending,
}

pub struct CredentialEntry<'a> {
    surface: &'a dyn BrowserSurface,
    input: &'a dyn InteractionSimulator,
    config: &'a LoginConfig,
    cancel: &'a CancellationToken,
}

impl<'a> CredentialEntry<'a> {
    pub fn new(
        surface: &'a dyn BrowserSurface,
        input: &'a dyn InteractionSimulator,
        config: &'a LoginConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            surface,
            input,
            config,
            cancel,
        }
    }

    /// Short pacing pauses derived from the settle delay (half and quarter
    /// beats of it), so shrinking the config shrinks the whole phase.
    fn beat(&self) -> Duration {
        self.config.settle() / 2
    }
    fn half_beat(&self) -> Duration {
        self.config.settle() / 4
    }

    /// Fill and submit the account identity.
    pub async fn enter_identity(&self, identity: &str) -> AppResult<()> {
        let field = self
            .surface
            .locate(IDENTITY_INPUT, self.config.field_wait(), Visibility::Visible)
            .await;
        if field.is_none() {
            warn!("identity field not found; continuing");
            return Ok(());
        }

        pause(self.beat(), self.cancel).await?;

        let prefilled = self
            .surface
            .locate(IDENTITY_PREFILL, self.config.prefill_wait(), Visibility::Attached)
            .await
            .is_some();
        if prefilled {
            info!("identity already prefilled by the provider");
        } else {
            self.surface.fill(IDENTITY_INPUT, "").await?;
            pause(self.half_beat(), self.cancel).await?;
            self.input
                .enter_text(self.surface, IDENTITY_INPUT, identity)
                .await?;
            pause(self.beat(), self.cancel).await?;
        }

        self.submit("identity").await
    }

    /// Fill and submit the account secret.
    ///
    /// Detects the "get a code to sign in" screen first and steers back to
    /// password entry through its method list. When no secret field exists
    /// at all, the provider has jumped straight to a verification
    /// challenge; the caller owns that dispatch.
    pub async fn enter_secret(&self, secret: &str) -> AppResult<SecretOutcome> {
        let passwordless = self
            .surface
            .locate(PASSWORDLESS_FOOTER, self.config.field_wait(), Visibility::Attached)
            .await
            .is_some();
        if passwordless {
            info!("one-time-code sign-in screen detected; switching to password entry");
            if self
                .surface
                .locate(PASSWORDLESS_OTHER_WAYS, self.config.field_wait(), Visibility::Visible)
                .await
                .is_some()
            {
                self.input
                    .activate(self.surface, PASSWORDLESS_OTHER_WAYS)
                    .await?;
                pause(self.config.settle(), self.cancel).await?;

                if self
                    .surface
                    .locate(
                        PASSWORDLESS_METHOD_ITEM,
                        self.config.field_wait(),
                        Visibility::Visible,
                    )
                    .await
                    .is_some()
                {
                    self.input
                        .activate(self.surface, PASSWORDLESS_METHOD_ITEM)
                        .await?;
                }
            }
        }

        let field = self
            .surface
            .locate(SECRET_INPUT, self.config.secret_wait(), Visibility::Visible)
            .await;
        if field.is_none() {
            warn!("secret field not found; a verification challenge is likely pending");
            return Ok(SecretOutcome::ChallengePending);
        }

        pause(self.beat(), self.cancel).await?;
        self.surface.fill(SECRET_INPUT, "").await?;
        pause(self.half_beat(), self.cancel).await?;
        self.input
            .enter_text(self.surface, SECRET_INPUT, secret)
            .await?;
        pause(self.beat(), self.cancel).await?;

        self.submit("secret").await?;
        Ok(SecretOutcome::Submitted)
    }

    async fn submit(&self, step: &str) -> AppResult<()> {
        let button = self
            .surface
            .locate(SUBMIT_BUTTON, self.config.field_wait(), Visibility::Visible)
            .await;
        match button {
            Some(_) => {
                self.input.activate(self.surface, SUBMIT_BUTTON).await?;
                pause(self.config.settle(), self.cancel).await?;
                debug!("{} submitted", step);
            }
            None => warn!("submission control not found after {} entry", step),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_browser::{DirectInteraction, ScriptedSurface, SurfaceAction};

    fn fast_config() -> LoginConfig {
        LoginConfig {
            settle_ms: 4,
            field_wait_ms: 1,
            prefill_wait_ms: 1,
            secret_wait_ms: 1,
            ..LoginConfig::default()
        }
    }

    #[tokio::test]
    async fn test_prefilled_identity_is_not_retyped() {
        let surface = ScriptedSurface::desktop();
        surface.present(IDENTITY_INPUT);
        surface.present(IDENTITY_PREFILL);
        surface.present(SUBMIT_BUTTON);

        let config = fast_config();
        let cancel = CancellationToken::new();
        let entry = CredentialEntry::new(&surface, &DirectInteraction, &config, &cancel);
        entry.enter_identity("user@example.com").await.unwrap();

        assert!(surface.fills_for(IDENTITY_INPUT).is_empty());
        assert!(surface
            .actions()
            .contains(&SurfaceAction::Activated(SUBMIT_BUTTON.to_string())));
    }

    #[tokio::test]
    async fn test_identity_typed_when_not_prefilled() {
        let surface = ScriptedSurface::desktop();
        surface.present(IDENTITY_INPUT);
        surface.present(SUBMIT_BUTTON);

        let config = fast_config();
        let cancel = CancellationToken::new();
        let entry = CredentialEntry::new(&surface, &DirectInteraction, &config, &cancel);
        entry.enter_identity("user@example.com").await.unwrap();

        // Cleared once by the phase, once by DirectInteraction, then typed.
        let fills = surface.fills_for(IDENTITY_INPUT);
        assert_eq!(fills.last().map(String::as_str), Some("user@example.com"));
    }

    #[tokio::test]
    async fn test_missing_identity_field_is_not_fatal() {
        let surface = ScriptedSurface::desktop();
        let config = fast_config();
        let cancel = CancellationToken::new();
        let entry = CredentialEntry::new(&surface, &DirectInteraction, &config, &cancel);

        entry.enter_identity("user@example.com").await.unwrap();
        assert!(surface.actions().is_empty());
    }

    #[tokio::test]
    async fn test_missing_secret_field_reports_pending_challenge() {
        let surface = ScriptedSurface::desktop();
        let config = fast_config();
        let cancel = CancellationToken::new();
        let entry = CredentialEntry::new(&surface, &DirectInteraction, &config, &cancel);

        let outcome = entry.enter_secret("hunter2").await.unwrap();
        assert_eq!(outcome, SecretOutcome::ChallengePending);
        assert!(surface.fills_for(SECRET_INPUT).is_empty());
    }

    #[tokio::test]
    async fn test_passwordless_screen_steers_to_method_list() {
        let surface = ScriptedSurface::desktop();
        surface.present(PASSWORDLESS_FOOTER);
        surface.present(PASSWORDLESS_OTHER_WAYS);
        surface.present(PASSWORDLESS_METHOD_ITEM);
        surface.present(SECRET_INPUT);
        surface.present(SUBMIT_BUTTON);

        let config = fast_config();
        let cancel = CancellationToken::new();
        let entry = CredentialEntry::new(&surface, &DirectInteraction, &config, &cancel);

        let outcome = entry.enter_secret("hunter2").await.unwrap();
        assert_eq!(outcome, SecretOutcome::Submitted);

        let actions = surface.actions();
        assert!(actions.contains(&SurfaceAction::Activated(PASSWORDLESS_OTHER_WAYS.to_string())));
        assert!(actions.contains(&SurfaceAction::Activated(PASSWORDLESS_METHOD_ITEM.to_string())));
        assert_eq!(
            surface.fills_for(SECRET_INPUT).last().map(String::as_str),
            Some("hunter2")
        );
    }
}
