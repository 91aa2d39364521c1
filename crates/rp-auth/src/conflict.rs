//! Advisory conflict avoidance for concurrent instances
//!
//! The identity provider accepts one pending verification challenge per
//! account. When desktop and mobile instances run in parallel they can
//! clobber each other's challenge; a randomized delay before requesting
//! one, followed by a re-check of the signed-in marker, makes the collision
//! unlikely and lets the loser detect that the winner already finished.
//! This is cooperative jitter, not mutual exclusion: the residual race is
//! accepted. A distributed lock keyed by the account identity would close
//! it, at the cost of a coordination service no deployment has.

use crate::util::pause;
use rand::Rng;
use rp_config::TwoFactorConfig;
use rp_types::AppResult;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct ParallelConflictGuard {
    enabled: bool,
    min: Duration,
    max: Duration,
}

impl ParallelConflictGuard {
    pub fn new(enabled: bool, config: &TwoFactorConfig) -> Self {
        let min = config.jitter_min();
        Self {
            enabled,
            min,
            // A window that is configured upside down degrades to a fixed
            // delay instead of panicking in gen_range.
            max: config.jitter_max().max(min),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Uniform draw from the configured window.
    pub fn draw_jitter(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleep the jitter before the challenge request. No-op when disabled;
    /// the caller re-checks the signed-in marker right after this returns.
    pub async fn pause_before_challenge(&self, cancel: &CancellationToken) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let jitter = self.draw_jitter();
        info!(
            "parallel mode: waiting {:.1}s before requesting a verification challenge",
            jitter.as_secs_f64()
        );
        pause(jitter, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_jitter_stays_in_window() {
        let config = TwoFactorConfig::default();
        let guard = ParallelConflictGuard::new(true, &config);

        for _ in 0..100 {
            let jitter = guard.draw_jitter();
            assert!(jitter >= Duration::from_millis(5_000), "{:?}", jitter);
            assert!(jitter <= Duration::from_millis(15_000), "{:?}", jitter);
        }
    }

    #[test]
    fn test_inverted_window_degrades_to_fixed_delay() {
        let config = TwoFactorConfig {
            jitter_min_ms: 100,
            jitter_max_ms: 10,
            ..TwoFactorConfig::default()
        };
        let guard = ParallelConflictGuard::new(true, &config);
        assert_eq!(guard.draw_jitter(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_disabled_guard_does_not_delay() {
        let guard = ParallelConflictGuard::disabled();
        let start = Instant::now();
        guard
            .pause_before_challenge(&CancellationToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
