//! Text entry and activation through an interaction layer
//!
//! Humanized pacing (typing cadence, pointer curves) belongs to the driver
//! side of this trait; the flows only say *what* to enter and activate.

use crate::surface::BrowserSurface;
use async_trait::async_trait;
use rp_types::AppResult;

#[async_trait]
pub trait InteractionSimulator: Send + Sync {
    /// Clear the target input and enter `text` into it.
    async fn enter_text(
        &self,
        surface: &dyn BrowserSurface,
        selector: &str,
        text: &str,
    ) -> AppResult<()>;

    /// Activate a control.
    async fn activate(&self, surface: &dyn BrowserSurface, selector: &str) -> AppResult<()>;
}

/// Plain pass-through implementation: clear, fill, click, no pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInteraction;

#[async_trait]
impl InteractionSimulator for DirectInteraction {
    async fn enter_text(
        &self,
        surface: &dyn BrowserSurface,
        selector: &str,
        text: &str,
    ) -> AppResult<()> {
        surface.fill(selector, "").await?;
        surface.fill(selector, text).await
    }

    async fn activate(&self, surface: &dyn BrowserSurface, selector: &str) -> AppResult<()> {
        surface.activate(selector).await
    }
}
