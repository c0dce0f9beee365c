//! Cloudinary-compatible media host client.
//!
//! - Direct upload: `POST {base}/v1_1/{cloud}/image/upload` (multipart)
//! - Destroy: `POST {base}/v1_1/{cloud}/image/destroy` (form, signed)
//!
//! A client built without a signer can upload (the authorization comes from
//! the server) but cannot destroy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::MediaError;
use crate::signature::{current_timestamp, UploadAuthorization, UploadSigner};

use super::{ImageFile, MediaHost, MediaUploader, UploadedAsset};

/// Public Cloudinary API endpoint.
pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com";

/// Uploads can be large; give them more time than admin calls.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// URL of an image API action for a cloud, e.g. `{base}/v1_1/{cloud}/image/upload`.
///
/// The cloud name is percent-encoded; a trailing slash on `base_url` is ignored.
pub fn image_endpoint(base_url: &str, cloud_name: &str, action: &str) -> String {
    format!(
        "{}/v1_1/{}/image/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(cloud_name),
        action
    )
}

/// Cloudinary API client.
#[derive(Clone)]
pub struct Cloudinary {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    signer: Option<UploadSigner>,
}

impl Cloudinary {
    /// Create a client for the given cloud.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, normally [`DEFAULT_CLOUDINARY_BASE_URL`]
    /// * `cloud_name` - Cloud (account) name
    /// * `api_key` - Public API key sent with every call
    pub fn new(
        base_url: impl Into<String>,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            signer: None,
        })
    }

    /// Attach the API-secret signer needed for admin calls.
    pub fn with_signer(mut self, signer: UploadSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn endpoint(&self, action: &str) -> String {
        image_endpoint(&self.base_url, &self.cloud_name, action)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct HostErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,

    #[serde(default)]
    public_id: Option<String>,

    #[serde(default)]
    error: Option<HostErrorBody>,
}

impl UploadResponse {
    fn into_result(self) -> Result<UploadedAsset, MediaError> {
        if let Some(error) = self.error {
            return Err(MediaError::Rejected(error.message));
        }
        match (self.secure_url, self.public_id) {
            (Some(secure_url), Some(public_id)) => Ok(UploadedAsset {
                secure_url,
                public_id,
            }),
            _ => Err(MediaError::Decode(
                "upload response has no secure_url/public_id".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    #[serde(default)]
    result: Option<String>,

    #[serde(default)]
    error: Option<HostErrorBody>,
}

impl DestroyResponse {
    fn into_result(self, public_id: &str) -> Result<(), MediaError> {
        if let Some(error) = self.error {
            return Err(MediaError::Rejected(error.message));
        }
        match self.result.as_deref() {
            Some("ok") => Ok(()),
            Some("not found") => Err(MediaError::NotFound(public_id.to_string())),
            Some(other) => Err(MediaError::Rejected(format!(
                "Failed to delete image: {}",
                other
            ))),
            None => Err(MediaError::Decode("destroy response has no result".to_string())),
        }
    }
}

// =============================================================================
// MediaUploader / MediaHost
// =============================================================================

#[async_trait]
impl MediaUploader for Cloudinary {
    async fn upload(
        &self,
        file: &ImageFile,
        authorization: &UploadAuthorization,
    ) -> Result<UploadedAsset, MediaError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| MediaError::Rejected(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", part)
            .text("signature", authorization.signature.clone())
            .text("timestamp", authorization.timestamp.to_string())
            .text("api_key", self.api_key.clone());
        for (key, value) in &authorization.params {
            form = form.text(key.clone(), value.clone());
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Connection(e.to_string()))?;

        // Error bodies come with 4xx statuses, so parse regardless of status
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        body.into_result()
    }
}

#[async_trait]
impl MediaHost for Cloudinary {
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            MediaError::Misconfigured("no API secret configured for destroy".to_string())
        })?;

        let timestamp = current_timestamp().to_string();
        let signature = signer
            .sign_params(&[("public_id", public_id), ("timestamp", &timestamp)])
            .map_err(|e| MediaError::Misconfigured(e.to_string()))?;

        debug!(public_id = public_id, "Destroying media object");

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Connection(e.to_string()))?;

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        body.into_result(public_id)
    }
}
