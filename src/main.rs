use log::error;
use rocket_oidc_login::OIDCConfig;
use rocket_oidc_login::errors::OIDCError;
use std::path::PathBuf;
use std::process::ExitCode;
use structopt::StructOpt;

/// OpenID Connect login demo: `/` is protected, `/callback` completes the login.
///
/// Settings not given on the command line come from CLIENT_ID, CLIENT_SECRET,
/// ISSUER_URL, REDIRECT_URL, SCOPES and REQUEST_TIMEOUT_SECS, and otherwise
/// fall back to a local Keycloak on port 18080.
#[derive(Debug, Clone, StructOpt)]
pub struct Args {
    /// OpenID Connect issuer, e.g. http://localhost:18080/auth/realms/master
    #[structopt(long)]
    issuer_url: Option<String>,
    /// client id registered with the provider
    #[structopt(long)]
    client_id: Option<String>,
    /// file holding the client secret
    #[structopt(long, parse(from_os_str))]
    client_secret_file: Option<PathBuf>,
    /// URL the provider redirects back to after login
    #[structopt(long)]
    redirect_url: Option<String>,
    /// extra scope to request besides `openid`, may be repeated
    #[structopt(long = "scope")]
    scopes: Vec<String>,
    /// address to listen on
    #[structopt(short, long, default_value = "127.0.0.1")]
    address: String,
    /// port to listen on
    #[structopt(short, long, default_value = "8080")]
    port: u16,
}

impl Args {
    fn oidc_config(&self) -> Result<OIDCConfig, OIDCError> {
        let mut config = OIDCConfig::from_env()?;
        if let Some(issuer_url) = &self.issuer_url {
            config.issuer_url = issuer_url.clone();
        }
        if let Some(client_id) = &self.client_id {
            config.client_id = client_id.clone();
        }
        if let Some(secret_file) = &self.client_secret_file {
            config.client_secret = rocket_oidc_login::utils::load_client_secret(secret_file)?;
        }
        if let Some(redirect_url) = &self.redirect_url {
            config.redirect = redirect_url.clone();
        }
        if !self.scopes.is_empty() {
            config.scopes = self.scopes.clone();
        }
        Ok(config)
    }
}

#[rocket::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::from_args();

    let config = match args.oidc_config() {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let figment = rocket::Config::figment()
        .merge(("address", args.address.clone()))
        .merge(("port", args.port));

    let rocket = match rocket_oidc_login::setup(rocket::custom(figment), config).await {
        Ok(rocket) => rocket,
        Err(err) => {
            error!("failed to initialize OpenID Connect login: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = rocket.launch().await {
        error!("server stopped: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
