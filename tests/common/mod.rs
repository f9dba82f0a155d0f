//! A mock identity provider for the integration tests.
//!
//! Serves a discovery document, a JWKS and a token endpoint from a wiremock
//! server, and signs ID tokens with the RSA key whose public half is in the
//! JWKS.
#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rocket::local::asynchronous::Client;
use rocket_oidc_login::OIDCConfig;
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-app";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URL: &str = "http://localhost:8080/callback";
pub const GOOD_CODE: &str = "good-code";
pub const KEY_ID: &str = "test-key";
pub const SUBJECT: &str = "f2c1f0d4-1f6e-4b59-9b7e-3b1f0a9c2d11";

const REALM_PATH: &str = "/realms/test";
const TRUSTED_KEY: &str = include_str!("../fixtures/test_rsa_key.pem");
const UNTRUSTED_KEY: &str = include_str!("../fixtures/untrusted_rsa_key.pem");
const JWKS: &str = include_str!("../fixtures/test_jwks.json");

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs()
}

/// Signs ID tokens the way the provider would.
pub struct TokenSigner {
    key: EncodingKey,
    kid: String,
}

impl TokenSigner {
    /// The key published in the provider's JWKS.
    pub fn trusted() -> Self {
        Self::from_pem(TRUSTED_KEY)
    }

    /// A key the provider never published, advertised under the trusted kid.
    pub fn untrusted() -> Self {
        Self::from_pem(UNTRUSTED_KEY)
    }

    fn from_pem(pem: &str) -> Self {
        Self {
            key: EncodingKey::from_rsa_pem(pem.as_bytes()).expect("valid RSA test key"),
            kid: KEY_ID.to_string(),
        }
    }

    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.key).expect("sign id token")
    }
}

pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    /// Starts the provider and expects exactly one discovery and one JWKS
    /// fetch over its lifetime.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let provider = Self { server };

        Mock::given(method("GET"))
            .and(path(format!("{REALM_PATH}/.well-known/openid-configuration")))
            .respond_with(ResponseTemplate::new(200).set_body_json(provider.discovery_document()))
            .expect(1)
            .named("discovery")
            .mount(&provider.server)
            .await;

        let jwks: Value = serde_json::from_str(JWKS).expect("valid JWKS fixture");
        Mock::given(method("GET"))
            .and(path(format!("{REALM_PATH}/protocol/openid-connect/certs")))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .expect(1)
            .named("jwks")
            .mount(&provider.server)
            .await;

        provider
    }

    pub fn issuer(&self) -> String {
        format!("{}{REALM_PATH}", self.server.uri())
    }

    pub fn authorization_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/auth", self.issuer())
    }

    fn token_path() -> String {
        format!("{REALM_PATH}/protocol/openid-connect/token")
    }

    fn discovery_document(&self) -> Value {
        let issuer = self.issuer();
        json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/protocol/openid-connect/auth"),
            "token_endpoint": format!("{issuer}/protocol/openid-connect/token"),
            "userinfo_endpoint": format!("{issuer}/protocol/openid-connect/userinfo"),
            "jwks_uri": format!("{issuer}/protocol/openid-connect/certs"),
            "response_types_supported": ["code", "id_token", "code id_token"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"],
            "scopes_supported": ["openid", "email", "profile"]
        })
    }

    /// Standard claims of an ID token issued to this client, valid for an hour.
    pub fn id_token_claims(&self) -> Value {
        let now = now();
        json!({
            "iss": self.issuer(),
            "sub": SUBJECT,
            "aud": CLIENT_ID,
            "exp": now + 3600,
            "iat": now,
            "preferred_username": "alice",
            "email": "alice@example.com",
            "email_verified": true
        })
    }

    /// Answers the token request for [`GOOD_CODE`] with `token_response`.
    pub async fn accept_code(&self, token_response: Value) {
        Mock::given(method("POST"))
            .and(path(Self::token_path()))
            .and(body_string_contains(format!("code={GOOD_CODE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_response))
            .named("token exchange")
            .mount(&self.server)
            .await;
    }

    /// Answers the token request for [`GOOD_CODE`] with `id_token`.
    pub async fn accept_code_with_id_token(&self, id_token: &str) {
        self.accept_code(token_response(Some(id_token))).await;
    }

    /// Rejects every other code the way Keycloak does.
    pub async fn reject_other_codes(&self) {
        Mock::given(method("POST"))
            .and(path(Self::token_path()))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Code not valid"
            })))
            .with_priority(10)
            .named("rejected code")
            .mount(&self.server)
            .await;
    }

    pub fn oidc_config(&self) -> OIDCConfig {
        OIDCConfig {
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            issuer_url: self.issuer(),
            redirect: REDIRECT_URL.to_string(),
            scopes: Vec::new(),
            request_timeout_secs: 5,
        }
    }

    /// A Rocket client for the login routes, discovered against this provider.
    pub async fn rocket_client(&self) -> Client {
        let figment = rocket::Config::figment()
            .merge(("port", 0))
            .merge(("log_level", rocket::config::LogLevel::Off));
        let rocket = rocket_oidc_login::setup(rocket::custom(figment), self.oidc_config())
            .await
            .expect("provider discovery");
        Client::tracked(rocket).await.expect("valid rocket instance")
    }
}

pub fn token_response(id_token: Option<&str>) -> Value {
    let mut response = json!({
        "access_token": "opaque-access-token",
        "token_type": "Bearer",
        "expires_in": 300
    });
    if let Some(id_token) = id_token {
        response["id_token"] = json!(id_token);
    }
    response
}
