//! Convenience functions throughout the crate go here
use cookie::Cookie;
use std::io::Read;
use std::path::Path;

/// Name of the cookie carrying the bearer ID token.
pub const SESSION_COOKIE: &str = "Authorization";

/// The session cookie for a verified ID token: `Authorization=Bearer <token>; Path=/`.
///
/// No expiry, `Secure`, `HttpOnly` or `SameSite` attribute is set.
pub fn session_cookie(raw_id_token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, format!("Bearer {}", raw_id_token)))
        .path("/")
        .build()
}

fn trim_trailing_whitespace(s: &str) -> String {
    s.trim_end().to_string()
}

/// Reads a client secret from a file, dropping the trailing newline editors add.
pub fn load_client_secret<P: AsRef<Path>>(secret_file: P) -> Result<String, std::io::Error> {
    let mut file = std::fs::File::open(secret_file.as_ref())?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;
    Ok(trim_trailing_whitespace(&contents))
}

/// Splits a comma separated scope list.
pub fn split_scopes(scopes: &str) -> Vec<String> {
    scopes
        .split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}
