//! Browser surface and collaborator capabilities for RewardsPilot
//!
//! The sign-in and authorization flows consume everything external through
//! the traits in this crate: the browser page itself, the interaction
//! layer, out-of-band verification codes, session persistence, and popup
//! dismissal. Reference implementations cover the simple cases; the real
//! browser driver implements `BrowserSurface` outside this workspace.

pub mod codes;
pub mod interaction;
pub mod popup;
pub mod scripted;
pub mod store;
pub mod surface;

pub use codes::{CodeProvider, StdinCodeProvider};
pub use interaction::{DirectInteraction, InteractionSimulator};
pub use popup::{KnownPopupDismisser, PopupDismisser};
pub use scripted::{ScriptedSurface, SurfaceAction};
pub use store::{FileSessionStore, SessionStore};
pub use surface::{BrowserSurface, Element, Visibility};
