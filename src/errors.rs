use log::error;
use openidconnect::{ConfigurationError, HttpClientError, RequestTokenError};
use rocket::Request;
use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response;
use std::io::Cursor;
use thiserror::Error;

pub type TokenErr = RequestTokenError<
    HttpClientError<reqwest::Error>,
    openidconnect::StandardErrorResponse<openidconnect::core::CoreErrorResponseType>,
>;

pub type DiscoveryErr = openidconnect::DiscoveryError<HttpClientError<reqwest::Error>>;

#[derive(Debug, Error)]
pub enum OIDCError {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("discovery error: {0}")]
    OIDCDiscoveryErr(#[from] DiscoveryErr),
    #[error("reqwest error: {0}")]
    RequestErr(#[from] reqwest::Error),
    #[error("url parsing error: {0}")]
    UrlErr(#[from] openidconnect::url::ParseError),
    #[error("openidconnect configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
    #[error("invalid setting {0}: {1}")]
    InvalidSetting(&'static str, String),
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    // Callback failures. The messages are what the browser sees.
    #[error("parse form error")]
    ParseForm,
    #[error("Can't get access token")]
    TokenExchange(#[source] TokenErr),
    #[error("missing token")]
    MissingIdToken,
    #[error("id token verify error: {0}")]
    Verification(#[from] openidconnect::ClaimsVerificationError),
    #[error("{0}")]
    ClaimsDecode(#[from] jsonwebtoken::errors::Error),
}

impl From<TokenErr> for OIDCError {
    fn from(err: TokenErr) -> OIDCError {
        OIDCError::TokenExchange(err)
    }
}

impl<'r> response::Responder<'r, 'static> for OIDCError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let body = self.to_string();
        match &self {
            OIDCError::TokenExchange(source) => {
                error!("{} {}: {}: {}", request.method(), request.uri(), body, source)
            }
            _ => error!("{} {}: {}", request.method(), request.uri(), body),
        }

        // Caller mistakes (bad or replayed codes) and provider outages are
        // deliberately not told apart.
        response::Response::build()
            .status(Status::InternalServerError)
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
