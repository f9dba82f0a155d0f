//! One-time discovery of the identity provider.
//!
//! [`ConfigProvider`] owns the only state shared between requests: the
//! discovered provider metadata ([`Provider`]) and the OAuth2 client built
//! from it ([`OIDCClient`]). Both are produced by a single discovery attempt
//! and handed out together for the life of the process.

use crate::claims::ClaimSet;
use crate::client::{OIDCClient, WorkingConfig};
use crate::errors::OIDCError;

use log::{debug, info};
use openidconnect::core::{
    CoreIdToken, CoreIdTokenVerifier, CoreProviderMetadata, CoreTokenResponse,
};
use openidconnect::{
    AuthorizationCode, ClaimsVerificationError, ClientId, IssuerUrl, Nonce, RequestTokenError,
};
use serde_json::Value;
use std::str::FromStr;
use tokio::sync::OnceCell;

/// Resolved identity-provider metadata: issuer, endpoints and signing keys.
#[derive(Debug, Clone)]
pub struct Provider {
    metadata: CoreProviderMetadata,
}

impl Provider {
    /// Fetches `<issuer>/.well-known/openid-configuration` and the JWKS it
    /// points to.
    pub async fn discover(
        issuer_url: &IssuerUrl,
        http_client: &reqwest::Client,
    ) -> Result<Self, OIDCError> {
        let metadata = CoreProviderMetadata::discover_async(issuer_url.clone(), http_client).await?;
        if metadata.token_endpoint().is_none() {
            return Err(OIDCError::InvalidSetting(
                "issuer_url",
                format!("{} does not advertise a token endpoint", issuer_url.as_str()),
            ));
        }
        Ok(Self { metadata })
    }

    pub fn issuer(&self) -> &IssuerUrl {
        self.metadata.issuer()
    }

    pub fn metadata(&self) -> &CoreProviderMetadata {
        &self.metadata
    }

    /// A verifier accepting ID tokens issued by this provider for `client_id`.
    pub fn verifier(&self, client_id: &ClientId) -> CoreIdTokenVerifier<'static> {
        CoreIdTokenVerifier::new_public_client(
            client_id.clone(),
            self.metadata.issuer().clone(),
            self.metadata.jwks().clone(),
        )
    }

    /// Checks signature, issuer, audience and expiry of `id_token`.
    ///
    /// The nonce is not compared: the login request does not keep the one it
    /// sent.
    pub fn verify(&self, client_id: &ClientId, id_token: &CoreIdToken) -> Result<(), OIDCError> {
        id_token.claims(&self.verifier(client_id), |_: Option<&Nonce>| -> Result<(), String> {
            Ok(())
        })?;
        Ok(())
    }
}

/// Explains a token response that failed to parse only because of its
/// `id_token`: absent or not a string is a missing token, a string that is
/// not a well-formed ID token fails verification. Returns `None` when the
/// rest of the response is broken too.
fn rejected_id_token(body: &[u8]) -> Option<OIDCError> {
    let mut response: Value = serde_json::from_slice(body).ok()?;
    let id_token = response.as_object_mut()?.remove("id_token");
    serde_json::from_value::<CoreTokenResponse>(response).ok()?;

    let Some(Value::String(raw)) = id_token else {
        return Some(OIDCError::MissingIdToken);
    };
    match CoreIdToken::from_str(&raw) {
        Ok(_) => None,
        Err(err) => Some(OIDCError::Verification(ClaimsVerificationError::Other(
            format!("malformed id token: {err}"),
        ))),
    }
}

/// Outcome of a successful callback.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub raw_id_token: String,
    pub claims: ClaimSet,
}

struct ProviderState {
    client: OIDCClient,
    provider: Provider,
}

/// Lazily discovers the provider once and hands out the result.
///
/// Concurrent first callers wait for the same discovery attempt. Its outcome,
/// success or failure, is kept: a failed discovery is not retried.
pub struct ConfigProvider {
    config: WorkingConfig,
    state: OnceCell<Result<ProviderState, OIDCError>>,
}

impl ConfigProvider {
    pub fn new(config: WorkingConfig) -> Self {
        Self {
            config,
            state: OnceCell::new(),
        }
    }

    /// Returns the client configuration and the provider handle, running
    /// discovery first if nobody has yet.
    pub async fn get_config(&self) -> Result<(&OIDCClient, &Provider), OIDCError> {
        match self.state.get_or_init(|| self.initialize()).await {
            Ok(state) => Ok((&state.client, &state.provider)),
            Err(err) => Err(OIDCError::ProviderUnavailable(err.to_string())),
        }
    }

    /// Whether the one-time discovery has completed, successfully or not.
    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    async fn initialize(&self) -> Result<ProviderState, OIDCError> {
        info!(
            "discovering OpenID Connect provider at {}",
            self.config.issuer_url().as_str()
        );
        let http_client = self.config.http_client()?;
        let provider = Provider::discover(self.config.issuer_url(), &http_client).await?;
        let client = OIDCClient::new(self.config.clone(), provider.metadata().clone(), http_client);
        Ok(ProviderState { client, provider })
    }

    /// Runs the callback half of the login: code exchange, ID token
    /// extraction, verification and claim decoding.
    pub async fn authenticate(&self, code: AuthorizationCode) -> Result<VerifiedLogin, OIDCError> {
        let (client, provider) = self.get_config().await?;

        let token_response = match client.exchange_code(code).await {
            Ok(token_response) => token_response,
            Err(OIDCError::TokenExchange(RequestTokenError::Parse(err, body))) => {
                if let Some(rejected) = rejected_id_token(&body) {
                    return Err(rejected);
                }
                return Err(OIDCError::TokenExchange(RequestTokenError::Parse(err, body)));
            }
            Err(err) => return Err(err),
        };
        let id_token = token_response
            .extra_fields()
            .id_token()
            .ok_or(OIDCError::MissingIdToken)?;

        provider.verify(client.client_id(), id_token)?;
        debug!("id token verified for client {}", client.client_id().as_str());

        let raw_id_token = id_token.to_string();
        let claims = ClaimSet::from_verified_token(&raw_id_token)?;
        Ok(VerifiedLogin {
            raw_id_token,
            claims,
        })
    }
}
