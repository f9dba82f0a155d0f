//! The claim set of a verified ID token as an open-ended map.
//!
//! Providers put whatever they like into an ID token, so claims are kept as
//! `serde_json::Value`s (string, number, boolean, null, sequence or nested
//! map) keyed by claim name instead of being forced into a fixed struct.

use crate::CoreClaims;
use jsonwebtoken::{DecodingKey, Validation};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(BTreeMap<String, Value>);

impl ClaimSet {
    /// Decodes the payload of an ID token whose signature, issuer, audience
    /// and lifetime have already been checked.
    ///
    /// Nothing is verified here. Never call this on a token that has not been
    /// through [`Provider::verify`](crate::provider::Provider::verify).
    pub fn from_verified_token(raw_id_token: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<ClaimSet>(
            raw_id_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(data.claims)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for ClaimSet {
    fn from(claims: BTreeMap<String, Value>) -> Self {
        Self(claims)
    }
}

impl CoreClaims for ClaimSet {
    fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    fn issuer(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }
}
