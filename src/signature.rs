//! Upload signatures for direct-to-host uploads.
//!
//! The browser (or any client) uploads files straight to the media host. To
//! do that without ever seeing the host's API secret, it first asks the
//! server for an [`UploadAuthorization`]: a timestamp plus a signature over
//! the parameters it is allowed to send.
//!
//! # Signing Scheme
//!
//! This is the media host's own request-signing scheme, so the host can
//! check the signature with the shared secret:
//!
//! ```text
//! signature = hex(SHA-256("{canonical_params}{api_secret}"))
//! ```
//!
//! `canonical_params` is every signed parameter as `key=value`, sorted by
//! key and joined with `&`. Parameters the host never signs (`file`,
//! `api_key`, `cloud_name`, `resource_type`, `signature`) and empty values
//! are dropped.
//!
//! ```text
//! folder=gallery&timestamp=1735689600
//! ```
//!
//! # Example
//!
//! ```rust
//! use cloud_gallery::signature::UploadSigner;
//!
//! let signer = UploadSigner::new("api-secret");
//! let authorization = signer.authorize().unwrap();
//! assert!(signer.verify(&authorization).is_ok());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::SignatureError;

/// Parameters the media host excludes from the signed string.
const UNSIGNED_PARAMS: &[&str] = &["file", "api_key", "cloud_name", "resource_type", "signature"];

/// One-shot permission to upload a single file directly to the media host.
///
/// Serialized as the body of the signature endpoint:
///
/// ```json
/// { "signature": "9f2c...", "timestamp": 1735689600 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAuthorization {
    /// Hex-encoded SHA-256 signature
    pub signature: String,

    /// Unix epoch seconds the signature was minted at
    pub timestamp: i64,

    /// Fixed upload parameters covered by the signature. The client must send
    /// them verbatim alongside the file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// Mints and checks upload signatures with the media host's API secret.
#[derive(Clone)]
pub struct UploadSigner {
    api_secret: Vec<u8>,
    fixed_params: BTreeMap<String, String>,
}

impl UploadSigner {
    /// Create a signer for the given API secret.
    pub fn new(api_secret: impl AsRef<[u8]>) -> Self {
        Self {
            api_secret: api_secret.as_ref().to_vec(),
            fixed_params: BTreeMap::new(),
        }
    }

    /// Add a fixed parameter to every upload authorization (e.g. `folder`).
    pub fn with_fixed_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fixed_params.insert(key.into(), value.into());
        self
    }

    /// Fixed parameters signed into every upload authorization.
    pub fn fixed_params(&self) -> &BTreeMap<String, String> {
        &self.fixed_params
    }

    /// Authorize one upload as of now.
    pub fn authorize(&self) -> Result<UploadAuthorization, SignatureError> {
        self.authorize_at(current_timestamp())
    }

    /// Authorize one upload with an explicit timestamp.
    pub fn authorize_at(&self, timestamp: i64) -> Result<UploadAuthorization, SignatureError> {
        let timestamp_value = timestamp.to_string();
        let mut params: Vec<(&str, &str)> = self
            .fixed_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.push(("timestamp", &timestamp_value));

        let signature = self.sign_params(&params)?;
        Ok(UploadAuthorization {
            signature,
            timestamp,
            params: self.fixed_params.clone(),
        })
    }

    /// Sign an arbitrary parameter set (used for admin calls such as destroy).
    pub fn sign_params(&self, params: &[(&str, &str)]) -> Result<String, SignatureError> {
        if self.api_secret.is_empty() {
            return Err(SignatureError::MissingSecret);
        }

        let mut hasher = Sha256::new();
        hasher.update(canonical_params(params).as_bytes());
        hasher.update(&self.api_secret);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Check an upload authorization against this signer's secret and fixed parameters.
    pub fn verify(&self, authorization: &UploadAuthorization) -> Result<(), SignatureError> {
        let timestamp_value = authorization.timestamp.to_string();
        let mut params: Vec<(&str, &str)> = authorization
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.push(("timestamp", &timestamp_value));

        self.verify_params(&params, &authorization.signature)
    }

    /// Check a signature over an arbitrary parameter set.
    pub fn verify_params(
        &self,
        params: &[(&str, &str)],
        signature: &str,
    ) -> Result<(), SignatureError> {
        let provided = hex::decode(signature).map_err(|_| SignatureError::InvalidFormat)?;
        let expected_hex = self.sign_params(params)?;
        let expected = hex::decode(&expected_hex).map_err(|_| SignatureError::InvalidFormat)?;

        if provided.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

impl std::fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSigner")
            .field("api_secret", &"<redacted>")
            .field("fixed_params", &self.fixed_params)
            .finish()
    }
}

/// Current Unix time in seconds.
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build the string the host signs: sorted `key=value` pairs joined by `&`.
pub fn canonical_params(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(key, value)| !value.is_empty() && !UNSIGNED_PARAMS.contains(key))
        .copied()
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cmp(b.1)));
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}
