/*!
OpenID Connect authorization-code login for Rocket.

`GET /` redirects a browser without a session cookie to the identity
provider. The provider sends the browser back to `/callback` with a code,
which is exchanged for tokens; the ID token is verified and stored in an
`Authorization` cookie, and the browser is sent back to `/`.

```rust,ignore
use rocket::launch;
use rocket_oidc_login::OIDCConfig;

#[launch]
async fn rocket() -> _ {
    let config = OIDCConfig::from_env().unwrap();
    rocket_oidc_login::setup(rocket::build(), config)
        .await
        .unwrap()
}
```

The session cookie is a plain bearer token: no expiry, no `Secure`,
`HttpOnly` or `SameSite` attributes, and `/` trusts its presence without
re-verifying it. Neither the `state` nor the `nonce` of the authorization
request is checked on the way back. Do not run this as-is in production.
*/
pub mod claims;
pub mod client;
pub mod errors;
pub mod provider;
pub mod routes;
pub mod utils;

use client::WorkingConfig;
use errors::OIDCError;
use provider::ConfigProvider;

use log::info;
use rocket::{Build, Rocket};
use serde_derive::{Deserialize, Serialize};
use std::env;

pub use claims::ClaimSet;

/// Access to the standard claims of a token.
pub trait CoreClaims {
    fn subject(&self) -> Option<&str>;
    fn issuer(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OIDCConfig {
    pub client_id: String,
    pub client_secret: String,
    pub issuer_url: String,
    pub redirect: String,
    /// Scopes requested on top of `openid`, which is always sent.
    pub scopes: Vec<String>,
    /// Timeout for discovery, JWKS and token requests.
    pub request_timeout_secs: u64,
}

/// please note this is just an example, and should not be used in production builds
/// rather `from_env` should be used to supply real credentials.
impl Default for OIDCConfig {
    fn default() -> OIDCConfig {
        Self {
            client_id: "test-app".to_string(),
            client_secret: "b4fd4da3-4a87-48bc-8327-ae50bdf2614c".to_string(),
            issuer_url: "http://localhost:18080/auth/realms/master".to_string(),
            redirect: "http://localhost:8080/callback".to_string(),
            scopes: Vec::new(),
            request_timeout_secs: 10,
        }
    }
}

impl OIDCConfig {
    /// Starts from [`OIDCConfig::default`] and overrides every value whose
    /// environment variable is set: `CLIENT_ID`, `CLIENT_SECRET`,
    /// `ISSUER_URL`, `REDIRECT_URL`, `SCOPES` (comma separated) and
    /// `REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, OIDCError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as [`OIDCConfig::from_env`] with an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, OIDCError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(client_id) = lookup("CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Some(secret) = lookup("CLIENT_SECRET") {
            config.client_secret = secret;
        }
        if let Some(url) = lookup("ISSUER_URL") {
            config.issuer_url = url;
        }
        if let Some(redirect) = lookup("REDIRECT_URL") {
            config.redirect = redirect;
        }
        if let Some(scopes) = lookup("SCOPES") {
            config.scopes = utils::split_scopes(&scopes);
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout.trim().parse().map_err(|err| {
                OIDCError::InvalidSetting("REQUEST_TIMEOUT_SECS", format!("{err}"))
            })?;
        }
        Ok(config)
    }
}

/// Discovers the identity provider and mounts the login routes.
///
/// Discovery happens here, before the server accepts any request, so an
/// unreachable or misconfigured provider is reported to the caller instead
/// of failing the first request.
pub async fn setup(
    rocket: Rocket<Build>,
    config: OIDCConfig,
) -> Result<Rocket<Build>, OIDCError> {
    let working = WorkingConfig::from_oidc_config(&config)?;
    let provider = ConfigProvider::new(working);

    let (_, handle) = provider.get_config().await?;
    info!("using OpenID Connect issuer {}", handle.issuer().as_str());

    Ok(rocket.manage(provider).mount("/", routes::get_routes()))
}
