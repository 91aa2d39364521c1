//! Authorization request construction

use rand::Rng;

/// Endpoints and fixed parameters of the provider's desktop OAuth client.
///
/// `Default` is the production configuration; tests point the fields at
/// local stand-ins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub redirect_url: String,
    pub token_url: String,
    pub client_id: String,
    pub scope: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://login.live.com/oauth20_authorize.srf".to_string(),
            redirect_url: "https://login.live.com/oauth20_desktop.srf".to_string(),
            token_url: "https://login.microsoftonline.com/consumers/oauth2/v2.0/token"
                .to_string(),
            client_id: "0000000040170455".to_string(),
            scope: "service::prod.rewardsplatform.microsoft.com::MBI_SSL".to_string(),
        }
    }
}

/// Fresh state nonce: 16 random bytes, hex-encoded.
pub fn generate_state_nonce() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Authorization URL for one attempt. The identity rides along as a login
/// hint so the provider preselects the right account, and offline access
/// is requested so the token outlives the browser session.
pub fn build_authorization_url(endpoints: &OAuthEndpoints, identity: &str, state: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&access_type=offline_access&login_hint={}",
        endpoints.authorize_url,
        urlencoding::encode(&endpoints.client_id),
        urlencoding::encode(&endpoints.redirect_url),
        urlencoding::encode(&endpoints.scope),
        urlencoding::encode(state),
        urlencoding::encode(identity),
    )
}
