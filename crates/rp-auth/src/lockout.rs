//! Account lockout gate

use crate::selectors::LOCK_BANNER;
use crate::util::pause;
use rp_browser::{BrowserSurface, Visibility};
use rp_config::LoginConfig;
use rp_types::{AppError, AppResult};
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Abort the attempt if the provider shows the abuse-lock banner.
///
/// Runs as a gate, not a query: a locked account needs a manual edit of the
/// account list, so the error is terminal. The banner probe is short; the
/// common unlocked case pays only the settle delay the page needs anyway.
pub async fn ensure_not_locked(
    surface: &dyn BrowserSurface,
    config: &LoginConfig,
    cancel: &CancellationToken,
) -> AppResult<()> {
    pause(config.settle(), cancel).await?;

    let locked = surface
        .locate(LOCK_BANNER, config.lock_probe(), Visibility::Visible)
        .await
        .is_some();
    if locked {
        error!("this account has been locked; remove it from the account list and restart");
        return Err(AppError::AccountLocked);
    }
    Ok(())
}
