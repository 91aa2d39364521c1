//! Verification-challenge detection and handling
//!
//! After credential submission the provider may demand a second factor.
//! Detection probes the known challenge markers in a fixed order and hands
//! the result to exactly one handler. SMS and email codes come from a human
//! through the `CodeProvider` capability; authenticator approval is a
//! bounded wait-for-approval loop; passkey screens are skipped or steered
//! to another method.

use crate::conflict::ParallelConflictGuard;
use crate::selectors::{
    APPROVAL_FORM, CONTINUE_CONTROLS, DIFFERENT_METHOD_LINKS, DISPLAY_SIGN_VARIANTS,
    EMAIL_CODE_INPUT, PASSKEY_SKIP_CONTROLS, PASSWORD_OPTIONS, PORTAL_MARKER, PORTAL_URL,
    RESEND_CODE_BUTTON, SECRET_INPUT, SEND_CODE_BUTTON, SMS_CODE_INPUT,
};
use crate::util::pause;
use rand::Rng;
use rp_browser::{BrowserSurface, CodeProvider, InteractionSimulator, Visibility};
use rp_config::TwoFactorConfig;
use rp_types::{AppError, AppResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The kind of challenge the provider is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Sms,
    EmailCode,
    AuthenticatorApp,
    PasskeyOrAlternative,
    Unsupported,
}

/// One detected challenge, consumed by exactly one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationChallenge {
    pub kind: ChallengeKind,
    /// Displayed approval number, when the challenge shows one.
    pub prompt: Option<String>,
}

impl VerificationChallenge {
    fn new(kind: ChallengeKind) -> Self {
        Self { kind, prompt: None }
    }

    fn authenticator(prompt: String) -> Self {
        Self {
            kind: ChallengeKind::AuthenticatorApp,
            prompt: Some(prompt),
        }
    }
}

pub struct TwoFactorDispatcher {
    surface: Arc<dyn BrowserSurface>,
    input: Arc<dyn InteractionSimulator>,
    codes: Arc<dyn CodeProvider>,
    guard: ParallelConflictGuard,
    config: TwoFactorConfig,
    cancel: CancellationToken,
}

impl TwoFactorDispatcher {
    pub fn new(
        surface: Arc<dyn BrowserSurface>,
        input: Arc<dyn InteractionSimulator>,
        codes: Arc<dyn CodeProvider>,
        guard: ParallelConflictGuard,
        config: TwoFactorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            surface,
            input,
            codes,
            guard,
            config,
            cancel,
        }
    }

    /// Detect and complete whatever challenge is pending.
    ///
    /// In parallel mode the jittered delay runs first, and the signed-in
    /// marker is re-checked before anything is requested: when another
    /// instance already completed the challenge, this one resolves without
    /// prompting anybody.
    pub async fn resolve(&self) -> AppResult<()> {
        pause(self.config.settle(), &self.cancel).await?;
        self.guard.pause_before_challenge(&self.cancel).await?;

        if self.portal_reached().await {
            info!("verification already completed; continuing");
            return Ok(());
        }
        debug!("challenge page: {}", self.surface.current_url().await);

        for round in 1..=self.config.detection_rounds.max(1) {
            if round > 1 {
                pause(self.config.settle(), &self.cancel).await?;
                if self.portal_reached().await {
                    info!("verification completed during method switch");
                    return Ok(());
                }
            }

            let challenge = self.detect().await?;
            match challenge.kind {
                ChallengeKind::Sms => return self.resolve_sms().await,
                ChallengeKind::EmailCode => return self.resolve_email_code().await,
                ChallengeKind::AuthenticatorApp => {
                    return self.resolve_authenticator(challenge.prompt).await
                }
                ChallengeKind::PasskeyOrAlternative => {
                    if !self.resolve_alternative().await? {
                        debug!(
                            "alternative handling made no progress (round {}/{})",
                            round, self.config.detection_rounds
                        );
                    }
                    // Either way the page may now show a different
                    // challenge; the next round re-detects.
                }
                ChallengeKind::Unsupported => break,
            }
        }

        // An alternative-method attempt in the final round may still have
        // landed us signed in.
        if self.portal_reached().await {
            return Ok(());
        }

        let url = self.surface.current_url().await;
        error!("no supported verification method detected at {}", url);
        Err(AppError::UnsupportedTwoFactorMethod(url))
    }

    async fn portal_reached(&self) -> bool {
        self.surface
            .locate(PORTAL_MARKER, self.config.probe_wait(), Visibility::Attached)
            .await
            .is_some()
    }

    /// First match wins: SMS code field, email code field, authenticator
    /// display number, then the platform-specific fallback scan.
    async fn detect(&self) -> AppResult<VerificationChallenge> {
        let probe = self.config.probe_wait();

        if self
            .surface
            .locate(SMS_CODE_INPUT, probe, Visibility::Visible)
            .await
            .is_some()
        {
            info!("SMS verification detected");
            return Ok(VerificationChallenge::new(ChallengeKind::Sms));
        }

        if self
            .surface
            .locate(EMAIL_CODE_INPUT, probe, Visibility::Visible)
            .await
            .is_some()
        {
            info!("email code verification detected");
            return Ok(VerificationChallenge::new(ChallengeKind::EmailCode));
        }

        if let Some(number) = self.read_display_sign().await? {
            info!("authenticator approval detected");
            return Ok(VerificationChallenge::authenticator(number));
        }

        if self.surface.is_mobile() {
            self.detect_mobile_fallback().await
        } else {
            self.detect_desktop_fallback().await
        }
    }

    /// Mobile challenge pages use their own markers; scan the broader set.
    async fn detect_mobile_fallback(&self) -> AppResult<VerificationChallenge> {
        debug!("no primary challenge marker; scanning mobile challenge markers");
        let probe = self.config.probe_wait();

        if self
            .surface
            .locate(SMS_CODE_INPUT, probe, Visibility::Attached)
            .await
            .is_some()
        {
            return Ok(VerificationChallenge::new(ChallengeKind::Sms));
        }
        if self
            .surface
            .locate(EMAIL_CODE_INPUT, probe, Visibility::Attached)
            .await
            .is_some()
        {
            return Ok(VerificationChallenge::new(ChallengeKind::EmailCode));
        }

        if self.surface.current_url().await.contains("passkey") {
            info!("passkey authentication page detected");
            return Ok(VerificationChallenge::new(
                ChallengeKind::PasskeyOrAlternative,
            ));
        }

        for selector in PASSKEY_SKIP_CONTROLS.iter().chain(CONTINUE_CONTROLS) {
            if self
                .surface
                .locate(selector, probe, Visibility::Visible)
                .await
                .is_some()
            {
                return Ok(VerificationChallenge::new(
                    ChallengeKind::PasskeyOrAlternative,
                ));
            }
        }

        Ok(VerificationChallenge::new(ChallengeKind::Unsupported))
    }

    async fn detect_desktop_fallback(&self) -> AppResult<VerificationChallenge> {
        debug!("no primary challenge marker; scanning for alternative controls");
        let probe = self.config.probe_wait();

        for selector in DIFFERENT_METHOD_LINKS.iter().chain(CONTINUE_CONTROLS) {
            if self
                .surface
                .locate(selector, probe, Visibility::Visible)
                .await
                .is_some()
            {
                return Ok(VerificationChallenge::new(
                    ChallengeKind::PasskeyOrAlternative,
                ));
            }
        }

        if self
            .surface
            .locate(SECRET_INPUT, probe, Visibility::Attached)
            .await
            .is_some()
        {
            warn!("provider is asking for password re-entry");
        }

        Ok(VerificationChallenge::new(ChallengeKind::Unsupported))
    }

    /// Read the number the approval page displays.
    ///
    /// Clicks the send-code control first when present, and after a
    /// cross-instance collision (the provider allows one pending challenge
    /// per account) waits and re-requests a bounded number of times.
    async fn read_display_sign(&self) -> AppResult<Option<String>> {
        if self
            .surface
            .locate(SEND_CODE_BUTTON, self.config.probe_wait(), Visibility::Visible)
            .await
            .is_some()
        {
            self.input
                .activate(self.surface.as_ref(), SEND_CODE_BUTTON)
                .await?;
            debug!("requested an approval code");
            pause(self.config.settle(), &self.cancel).await?;
        }

        if let Some(number) = self.scan_display_variants().await {
            return Ok(Some(number));
        }

        if self.guard.is_enabled() {
            for round in 1..=self.config.max_conflict_waits {
                let collided = self
                    .surface
                    .locate(RESEND_CODE_BUTTON, self.config.probe_wait(), Visibility::Visible)
                    .await
                    .is_some();
                if !collided {
                    break;
                }

                warn!(
                    "another instance holds the pending challenge; re-requesting in {:.0}s (round {}/{})",
                    self.config.conflict_retry_delay().as_secs_f64(),
                    round,
                    self.config.max_conflict_waits
                );
                pause(self.config.conflict_retry_delay(), &self.cancel).await?;
                let _ = self
                    .input
                    .activate(self.surface.as_ref(), RESEND_CODE_BUTTON)
                    .await;
                pause(self.config.settle(), &self.cancel).await?;
            }

            if let Some(number) = self.scan_display_variants().await {
                return Ok(Some(number));
            }
        }

        Ok(None)
    }

    async fn scan_display_variants(&self) -> Option<String> {
        for selector in DISPLAY_SIGN_VARIANTS {
            let element = self
                .surface
                .locate(selector, self.config.probe_wait(), Visibility::Visible)
                .await;
            if let Some(element) = element {
                if let Some(number) = element.trimmed_text() {
                    debug!("approval number element: {}", selector);
                    return Some(number);
                }
            }
        }
        None
    }

    async fn resolve_sms(&self) -> AppResult<()> {
        info!("an SMS code is required to finish signing in");
        let code = self
            .codes
            .prompt_for_code("Enter the SMS code sent to your phone:")
            .await?;

        self.input
            .enter_text(self.surface.as_ref(), SMS_CODE_INPUT, &code)
            .await?;
        self.surface.press("Enter").await?;
        info!("SMS code submitted");
        Ok(())
    }

    async fn resolve_email_code(&self) -> AppResult<()> {
        info!("an email verification code is required to finish signing in");
        let code = self
            .codes
            .prompt_for_code("Enter the verification code sent to your email:")
            .await?;

        self.input
            .enter_text(self.surface.as_ref(), EMAIL_CODE_INPUT, &code)
            .await?;
        self.surface.press("Enter").await?;
        info!("email verification code submitted");
        Ok(())
    }

    /// Wait for the operator to approve the sign-in in their authenticator
    /// app. A wrong press or an expired number surfaces as the form
    /// refusing to detach; each retry requests a replacement code, under
    /// both an attempt budget and an overall deadline.
    async fn resolve_authenticator(&self, mut prompt: Option<String>) -> AppResult<()> {
        let deadline = Instant::now() + self.config.approval_deadline();
        let max_attempts = self.config.max_approval_attempts.max(1);
        let mut attempts = 0;

        while attempts < max_attempts && Instant::now() < deadline {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            attempts += 1;

            match &prompt {
                Some(number) => info!(
                    "press {} in your authenticator app to approve the sign-in",
                    number
                ),
                None => info!("approve the sign-in request in your authenticator app"),
            }

            if self
                .surface
                .wait_detached(APPROVAL_FORM, self.config.approval_wait())
                .await
            {
                info!("sign-in approved");
                return Ok(());
            }

            warn!(
                "approval not received in time (attempt {}/{})",
                attempts, max_attempts
            );
            if attempts == max_attempts {
                break;
            }

            pause(self.approval_backoff(attempts), &self.cancel).await?;
            let _ = self
                .input
                .activate(self.surface.as_ref(), RESEND_CODE_BUTTON)
                .await;
            prompt = self.read_display_sign().await?;
        }

        error!("authenticator approval budget exhausted");
        Err(AppError::VerificationExhausted { attempts })
    }

    fn approval_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base();
        let jitter = if base.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..base)
        };
        base * attempt + jitter
    }

    /// Try to get past a passkey screen: skip controls, then another
    /// verification method, then the portal directly. `false` means no
    /// attempt stuck; that is not fatal, the caller re-detects.
    async fn resolve_alternative(&self) -> AppResult<bool> {
        let probe = self.config.probe_wait();

        for selector in PASSKEY_SKIP_CONTROLS {
            if self
                .surface
                .locate(selector, probe, Visibility::Visible)
                .await
                .is_some()
            {
                self.input.activate(self.surface.as_ref(), selector).await?;
                info!("skipped challenge screen via {}", selector);
                pause(self.config.settle(), &self.cancel).await?;
                return Ok(true);
            }
        }

        for selector in DIFFERENT_METHOD_LINKS {
            if self
                .surface
                .locate(selector, probe, Visibility::Visible)
                .await
                .is_some()
            {
                self.input.activate(self.surface.as_ref(), selector).await?;
                info!("requested a different verification method");
                pause(self.config.settle(), &self.cancel).await?;

                for option in PASSWORD_OPTIONS {
                    if self
                        .surface
                        .locate(option, probe, Visibility::Visible)
                        .await
                        .is_some()
                    {
                        self.input.activate(self.surface.as_ref(), option).await?;
                        info!("selected password verification");
                        pause(self.config.settle(), &self.cancel).await?;
                        break;
                    }
                }
                return Ok(true);
            }
        }

        info!("no skip control; navigating directly to the rewards portal");
        self.surface.navigate(PORTAL_URL).await?;
        pause(self.config.settle(), &self.cancel).await?;
        Ok(self.portal_reached().await)
    }
}
