use crate::errors::OIDCError;
use crate::provider::ConfigProvider;
use crate::utils::{SESSION_COOKIE, session_cookie};

use cookie::Cookie;
use log::{debug, info, warn};
use openidconnect::AuthorizationCode;
use rocket::form::{Errors, Form};
use rocket::http::{CookieJar, Status};
use rocket::response::{self, Redirect, Responder};
use rocket::{FromForm, Request, Response, Route, State, get, post, routes};

/// Query string or form body the provider sends back to `/callback`.
///
/// Keycloak also sends `session_state` and `iss`; unknown fields are ignored.
#[derive(Debug, FromForm)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    /// Fields set in `other` replace those in `self`.
    fn overlay(self, other: CallbackParams) -> CallbackParams {
        CallbackParams {
            code: other.code.or(self.code),
            state: other.state.or(self.state),
            error: other.error.or(self.error),
            error_description: other.error_description.or(self.error_description),
        }
    }
}

#[derive(Debug, rocket::Responder)]
pub enum IndexResponse {
    Protected(&'static str),
    Login(Redirect),
}

/// `302 Found` to `/` carrying the session cookie.
#[derive(Debug)]
pub struct SessionRedirect {
    cookie: Cookie<'static>,
}

impl SessionRedirect {
    pub fn new(cookie: Cookie<'static>) -> Self {
        Self { cookie }
    }
}

impl<'r> Responder<'r, 'static> for SessionRedirect {
    fn respond_to(self, _request: &'r Request<'_>) -> response::Result<'static> {
        // Written as a raw header: Rocket's cookie jar would add HttpOnly and
        // SameSite=Strict to anything it sets.
        Response::build()
            .status(Status::Found)
            .raw_header("Location", "/")
            .raw_header("Set-Cookie", self.cookie.to_string())
            .ok()
    }
}

/// The protected page. Only the presence of the session cookie is checked.
#[get("/")]
pub async fn index(
    jar: &CookieJar<'_>,
    provider: &State<ConfigProvider>,
) -> Result<IndexResponse, OIDCError> {
    if jar.get(SESSION_COOKIE).is_some() {
        return Ok(IndexResponse::Protected("login success"));
    }

    let (client, _) = provider.get_config().await?;
    let authorize_url = client.authorize_url();
    debug!("no session cookie, redirecting to {}", authorize_url);
    Ok(IndexResponse::Login(Redirect::found(authorize_url.to_string())))
}

#[get("/callback?<params..>")]
pub async fn callback(
    params: Result<CallbackParams, Errors<'_>>,
    provider: &State<ConfigProvider>,
) -> Result<SessionRedirect, OIDCError> {
    let params = params.map_err(|errors| {
        debug!("invalid callback query: {}", errors);
        OIDCError::ParseForm
    })?;
    complete_login(provider, params).await
}

/// Form posts may also carry parameters in the query string; body fields win.
/// A body that is not a form is ignored rather than rejected.
#[post("/callback?<query..>", data = "<form>")]
pub async fn callback_form(
    query: Result<CallbackParams, Errors<'_>>,
    form: Option<Result<Form<CallbackParams>, Errors<'_>>>,
    provider: &State<ConfigProvider>,
) -> Result<SessionRedirect, OIDCError> {
    let query = query.map_err(|errors| {
        debug!("invalid callback query: {}", errors);
        OIDCError::ParseForm
    })?;
    let params = match form {
        Some(Ok(form)) => query.overlay(form.into_inner()),
        Some(Err(errors)) => {
            debug!("invalid callback form: {}", errors);
            return Err(OIDCError::ParseForm);
        }
        None => {
            debug!("callback body is not a form, using query parameters only");
            query
        }
    };
    complete_login(provider, params).await
}

async fn complete_login(
    provider: &ConfigProvider,
    params: CallbackParams,
) -> Result<SessionRedirect, OIDCError> {
    if let Some(error) = &params.error {
        warn!(
            "provider returned error {}: {}",
            error,
            params.error_description.as_deref().unwrap_or("no description")
        );
    }
    if params.state.as_deref().is_some_and(|state| !state.is_empty()) {
        debug!("ignoring non-empty state parameter");
    }

    // A missing code is sent as-is; the token endpoint rejects it.
    let code = AuthorizationCode::new(params.code.unwrap_or_default());
    let login = provider.authenticate(code).await?;
    info!("id token claims: {:?}", login.claims);

    Ok(SessionRedirect::new(session_cookie(&login.raw_id_token)))
}

pub fn get_routes() -> Vec<Route> {
    routes![index, callback, callback_form]
}
