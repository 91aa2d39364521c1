//! Interstitial and popup dismissal
//!
//! One canonical component handles every known interstitial: the sign-in
//! prompts (passkey enrollment, keep-me-signed-in) and the rewards-page
//! popups (referral, streak protection/restore, generic modals). Instances
//! are injected where needed; per-kind reentry is guarded so a popup that
//! is dismissed once is not hunted for again during the same run.

use crate::surface::{BrowserSurface, Visibility};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait PopupDismisser: Send + Sync {
    /// Scan for known popups and dismiss what is found. Returns true if
    /// anything was dismissed. Never fails: a popup that refuses to close
    /// is logged and left for the next scan.
    async fn dismiss_known(&self, surface: &dyn BrowserSurface) -> bool;
}

/// One recognizable popup: how to spot it and how to close it.
struct PopupRule {
    kind: &'static str,
    detect: &'static [&'static str],
    dismiss: &'static [&'static str],
    /// Dismiss at most once per run. Sign-in prompts reappear in the DOM
    /// after dismissal but stay hidden; re-clicking them loops forever.
    once: bool,
}

const RULES: &[PopupRule] = &[
    PopupRule {
        kind: "passkey-prompt",
        detect: &["[data-testid=\"biometricVideo\"]"],
        dismiss: &["[data-testid=\"secondaryButton\"]"],
        once: true,
    },
    PopupRule {
        kind: "keep-signed-in",
        detect: &["[data-testid=\"kmsiVideo\"]"],
        dismiss: &["[data-testid=\"primaryButton\"]"],
        once: true,
    },
    PopupRule {
        kind: "referral",
        detect: &[
            "[data-testid=\"referral-popup\"]",
            "[data-testid=\"referral-modal\"]",
            ".referral-container",
            ".invite-modal",
        ],
        dismiss: CLOSE_CONTROLS,
        once: false,
    },
    PopupRule {
        kind: "streak-protection",
        detect: &[
            "[data-testid=\"streak-protection-popup\"]",
            "[data-testid=\"streak-protection-modal\"]",
            ".streak-protection-modal",
            ".streak-popup",
        ],
        dismiss: CLOSE_CONTROLS,
        once: false,
    },
    PopupRule {
        kind: "streak-restore",
        detect: &[
            "[data-testid=\"streak-restore-popup\"]",
            "[data-testid=\"streak-restore-modal\"]",
            ".streak-restore-modal",
        ],
        dismiss: CLOSE_CONTROLS,
        once: false,
    },
    PopupRule {
        kind: "generic-modal",
        detect: &["[role=\"dialog\"] [aria-label=\"Close\"]"],
        dismiss: &["[role=\"dialog\"] [aria-label=\"Close\"]"],
        once: false,
    },
];

const CLOSE_CONTROLS: &[&str] = &[
    "[data-testid=\"close-button\"]",
    "button[aria-label=\"Close\"]",
    ".close-button",
];

/// Probe bound per selector. Scans run between every navigation round, so
/// they have to stay cheap when nothing is present.
const DETECT_PROBE: Duration = Duration::from_millis(500);

/// Dismisses the popups in the rule table above.
#[derive(Default)]
pub struct KnownPopupDismisser {
    handled: Mutex<HashSet<&'static str>>,
}

impl KnownPopupDismisser {
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply_rule(&self, surface: &dyn BrowserSurface, rule: &PopupRule) -> bool {
        let detected = {
            let mut found = false;
            for selector in rule.detect {
                if surface
                    .locate(selector, DETECT_PROBE, Visibility::Visible)
                    .await
                    .is_some()
                {
                    found = true;
                    break;
                }
            }
            found
        };
        if !detected {
            return false;
        }

        for selector in rule.dismiss {
            if surface
                .locate(selector, DETECT_PROBE, Visibility::Visible)
                .await
                .is_none()
            {
                continue;
            }
            match surface.activate(selector).await {
                Ok(()) => {
                    debug!("dismissed \"{}\" popup via {}", rule.kind, selector);
                    return true;
                }
                Err(e) => {
                    warn!("failed to dismiss \"{}\" popup: {}", rule.kind, e);
                }
            }
        }

        warn!("\"{}\" popup detected but no dismiss control worked", rule.kind);
        false
    }
}

#[async_trait]
impl PopupDismisser for KnownPopupDismisser {
    async fn dismiss_known(&self, surface: &dyn BrowserSurface) -> bool {
        let mut dismissed_any = false;

        for rule in RULES {
            if rule.once && self.handled.lock().contains(rule.kind) {
                continue;
            }
            if self.apply_rule(surface, rule).await {
                dismissed_any = true;
                if rule.once {
                    self.handled.lock().insert(rule.kind);
                }
            }
        }

        dismissed_any
    }
}
