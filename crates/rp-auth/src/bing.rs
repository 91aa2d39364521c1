//! Companion-surface sign-in confirmation
//!
//! Rewards activities run against Bing, which federates from the account
//! just signed in. This probe confirms the federation actually happened.
//! Failure here is advisory: the caller logs it and carries on, because
//! the session is often still usable.

use crate::selectors::{BING_CONFIRMED_MARKER, BING_HOST, BING_VERIFY_URL};
use crate::util::pause;
use rp_browser::{BrowserSurface, PopupDismisser, Visibility};
use rp_config::LoginConfig;
use rp_types::AppResult;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

fn at_bing_root(current: &str) -> bool {
    Url::parse(current)
        .map(|url| url.host_str() == Some(BING_HOST) && url.path() == "/")
        .unwrap_or(false)
}

/// Returns true once the Bing surface confirms the sign-in, false when the
/// iteration budget runs out first.
pub async fn verify_bing_login(
    surface: &dyn BrowserSurface,
    popups: &dyn PopupDismisser,
    config: &LoginConfig,
    cancel: &CancellationToken,
) -> AppResult<bool> {
    info!("verifying the Bing sign-in");
    surface.navigate(BING_VERIFY_URL).await?;

    for _ in 1..=config.verify_rounds.max(1) {
        let current = surface.current_url().await;
        if at_bing_root(&current) {
            popups.dismiss_known(surface).await;

            // Mobile Bing renders no account marker; arriving back at the
            // root is the whole signal there.
            if surface.is_mobile() {
                info!("Bing sign-in verified");
                return Ok(true);
            }
            let confirmed = surface
                .locate(BING_CONFIRMED_MARKER, config.bing_probe(), Visibility::Attached)
                .await
                .is_some();
            if confirmed {
                info!("Bing sign-in verified");
                return Ok(true);
            }
        }

        pause(config.retry_pause(), cancel).await?;
    }

    warn!(
        "could not confirm the Bing sign-in within {} rounds",
        config.verify_rounds
    );
    Ok(false)
}
