//! Page markers and controls on the identity provider's sign-in surfaces
//!
//! Selector strings are opaque to this crate; the browser driver resolves
//! them (including the `:has-text()` engine used for text-anchored
//! controls).

// Entry points and arrival markers.
pub(crate) const SIGNIN_URL: &str = "https://rewards.bing.com/signin";
pub(crate) const PORTAL_URL: &str = "https://rewards.bing.com/";
pub(crate) const PORTAL_HOST: &str = "rewards.bing.com";
pub(crate) const PORTAL_MARKER: &str = "html[data-role-name=\"RewardsPortal\"]";

// Account lockout.
pub(crate) const LOCK_BANNER: &str = "#serviceAbuseLandingTitle";

// Credential entry.
pub(crate) const IDENTITY_INPUT: &str = "input[type=\"email\"]";
pub(crate) const IDENTITY_PREFILL: &str = "#userDisplayName";
pub(crate) const SECRET_INPUT: &str = "input[type=\"password\"]";
pub(crate) const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";

// "Get a code to sign in" screen, steered back to password entry.
pub(crate) const PASSWORDLESS_FOOTER: &str = "[data-testid=\"viewFooter\"]";
pub(crate) const PASSWORDLESS_OTHER_WAYS: &str = "[data-testid=\"viewFooter\"] span[role=\"button\"]";
pub(crate) const PASSWORDLESS_METHOD_ITEM: &str = "[role=\"listitem\"]:nth-of-type(2)";

// Verification challenges.
pub(crate) const SMS_CODE_INPUT: &str = "input[name=\"otc\"]";
pub(crate) const EMAIL_CODE_INPUT: &str = "input[name=\"proofconfirmation\"]";
pub(crate) const SEND_CODE_BUTTON: &str = "button[aria-describedby=\"confirmSendTitle\"]";
pub(crate) const RESEND_CODE_BUTTON: &str =
    "button[aria-describedby=\"pushNotificationsTitle errorDescription\"]";
pub(crate) const APPROVAL_FORM: &str = "form[name=\"f1\"]";

/// The approval number moves between these as the provider iterates on the
/// challenge page; tried in order.
pub(crate) const DISPLAY_SIGN_VARIANTS: &[&str] = &[
    "#displaySign",
    "div[data-testid=\"displaySign\"]>span",
    "[data-testid=\"displaySign\"]",
    "span[aria-label*=\"verification\"]",
    ".display-sign-container span",
];

// Passkey screens and method-switch controls.
pub(crate) const PASSKEY_SKIP_CONTROLS: &[&str] = &[
    "button[data-testid=\"secondaryButton\"]",
    "a:has-text(\"Use a different method\")",
    "button:has-text(\"Skip\")",
    "a:has-text(\"Skip\")",
    "[data-testid=\"alternativeVerificationMethodLink\"]",
];
pub(crate) const DIFFERENT_METHOD_LINKS: &[&str] = &[
    "a:has-text(\"Use a different method\")",
    "button:has-text(\"Use a different method\")",
];
pub(crate) const PASSWORD_OPTIONS: &[&str] = &[
    "span:has-text(\"Password\")",
    "div:has-text(\"Password\")",
];
pub(crate) const CONTINUE_CONTROLS: &[&str] = &[
    "button[type=\"submit\"]",
    "button:has-text(\"Continue\")",
    "button:has-text(\"Next\")",
    "input[type=\"submit\"]",
];

// Companion Bing surface.
pub(crate) const BING_VERIFY_URL: &str = "https://www.bing.com/fd/auth/signin?action=interactive&provider=windows_live_id&return_url=https%3A%2F%2Fwww.bing.com%2F";
pub(crate) const BING_HOST: &str = "www.bing.com";
pub(crate) const BING_CONFIRMED_MARKER: &str = "#id_n";
