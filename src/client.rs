use crate::OIDCConfig;
use crate::errors::OIDCError;

use log::debug;
use openidconnect::core::{CoreClient, CoreProviderMetadata, CoreResponseType, CoreTokenResponse};
use openidconnect::url::Url;
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, RedirectUrl, Scope,
};
use std::time::Duration;

/// The OpenID Connect client as returned by `from_provider_metadata`: the
/// authorization endpoint is always known, token and userinfo endpoints
/// only if the discovery document lists them.
pub type OpenIDClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Validated client settings.
///
/// Built from a [`OIDCConfig`]; every URL has been parsed and the `openid`
/// scope is implicit.
#[derive(Debug, Clone)]
pub struct WorkingConfig {
    client_id: ClientId,
    client_secret: ClientSecret,
    issuer_url: IssuerUrl,
    redirect: RedirectUrl,
    scopes: Vec<Scope>,
    request_timeout: Duration,
}

impl WorkingConfig {
    /// Constructs a new `WorkingConfig` from a high-level `OIDCConfig`.
    ///
    /// # Errors
    /// Returns an error if the issuer or redirect URL cannot be parsed, or if
    /// the client id is empty.
    pub fn from_oidc_config(config: &OIDCConfig) -> Result<Self, OIDCError> {
        if config.client_id.trim().is_empty() {
            return Err(OIDCError::InvalidSetting("client_id", "must not be empty".to_string()));
        }

        // `openid` is always requested by the authorization request itself.
        let scopes = config
            .scopes
            .iter()
            .map(|scope| scope.trim())
            .filter(|scope| !scope.is_empty() && *scope != "openid")
            .map(|scope| Scope::new(scope.to_string()))
            .collect();

        Ok(Self {
            client_id: ClientId::new(config.client_id.clone()),
            client_secret: ClientSecret::new(config.client_secret.clone()),
            issuer_url: IssuerUrl::new(config.issuer_url.clone())?,
            redirect: RedirectUrl::new(config.redirect.clone())?,
            scopes,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn issuer_url(&self) -> &IssuerUrl {
        &self.issuer_url
    }

    pub fn redirect(&self) -> &RedirectUrl {
        &self.redirect
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Builds the HTTP client shared by discovery and token requests.
    pub fn http_client(&self) -> Result<reqwest::Client, OIDCError> {
        Ok(reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.request_timeout)
            .build()?)
    }
}

/// The OAuth2 side of the login: client credentials, provider endpoints,
/// scopes and redirect URL, bound to an HTTP client.
#[derive(Debug, Clone)]
pub struct OIDCClient {
    // The OpenID Connect client instance, created from discovered provider metadata.
    pub client: OpenIDClient,

    reqwest_client: reqwest::Client,

    config: WorkingConfig,
}

impl OIDCClient {
    pub fn new(
        config: WorkingConfig,
        provider_metadata: CoreProviderMetadata,
        reqwest_client: reqwest::Client,
    ) -> Self {
        let client = CoreClient::from_provider_metadata(
            provider_metadata,
            config.client_id.clone(),
            Some(config.client_secret.clone()),
        )
        .set_redirect_uri(config.redirect.clone());

        Self {
            client,
            reqwest_client,
            config,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.config.client_id
    }

    /// Builds the URL of the provider's login page for an authorization-code
    /// request.
    ///
    /// The `state` parameter is sent empty and the generated nonce is thrown
    /// away, so neither can be checked on the callback.
    pub fn authorize_url(&self) -> Url {
        let mut request = self.client.authorize_url(
            AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
            || CsrfToken::new(String::new()),
            Nonce::new_random,
        );
        for scope in &self.config.scopes {
            request = request.add_scope(scope.clone());
        }
        let (url, _state, _nonce) = request.url();
        url
    }

    /// Exchanges an authorization code (received after user login) for a token response.
    ///
    /// # Errors
    /// Returns an error if the token request fails or the provider rejects the
    /// code. Codes are single use, so nothing is retried.
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<CoreTokenResponse, OIDCError> {
        debug!("exchanging authorization code at the token endpoint");
        Ok(self
            .client
            .exchange_code(code)?
            .request_async(&self.reqwest_client)
            .await?)
    }
}
