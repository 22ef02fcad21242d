// Content-addressed document storage through a Pinata-compatible pinning API.
//
// No retry here: each call is a fresh, billable request and callers decide
// whether a failure is worth repeating.

use async_trait::async_trait;
use chaperone_core::NftMetadata;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no pinning service token configured (set PINATA_JWT)")]
    MissingToken,
    #[error("pinning service returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("pinning service unreachable: {0}")]
    Transport(String),
    #[error("unexpected pinning service response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pins a binary document and returns its gateway URI.
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<String, UploadError>;

    /// Pins a metadata document and returns its gateway URI.
    async fn upload_json(&self, metadata: &NftMetadata) -> Result<String, UploadError>;
}

/// `<gateway>/ipfs/<hash>`
pub fn gateway_uri(gateway_url: &str, hash: &str) -> String {
    format!("{}/ipfs/{}", gateway_url.trim_end_matches('/'), hash)
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

pub struct PinataClient {
    client: reqwest::Client,
    api_url: String,
    gateway_url: String,
    jwt: Option<String>,
}

impl PinataClient {
    pub fn new(
        api_url: impl Into<String>,
        gateway_url: impl Into<String>,
        jwt: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            gateway_url: gateway_url.into(),
            jwt,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/pinning/{}", self.api_url.trim_end_matches('/'), path)
    }

    fn token(&self) -> Result<&str, UploadError> {
        self.jwt.as_deref().ok_or(UploadError::MissingToken)
    }

    async fn finish(&self, request: reqwest::RequestBuilder) -> Result<String, UploadError> {
        let response = request
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        Ok(gateway_uri(&self.gateway_url, &pinned.ipfs_hash))
    }
}

#[async_trait]
impl ContentStore for PinataClient {
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let token = self.token()?;
        debug!(name, size = bytes.len(), "pinning file");
        let form = Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()));
        let request = self
            .client
            .post(self.endpoint("pinFileToIPFS"))
            .bearer_auth(token)
            .multipart(form);
        let uri = self.finish(request).await?;
        info!(name, %uri, "file pinned");
        Ok(uri)
    }

    async fn upload_json(&self, metadata: &NftMetadata) -> Result<String, UploadError> {
        let token = self.token()?;
        let body = json!({
            "pinataContent": metadata,
            "pinataMetadata": { "name": format!("{}.json", metadata.name) },
        });
        let request = self
            .client
            .post(self.endpoint("pinJSONToIPFS"))
            .bearer_auth(token)
            .json(&body);
        let uri = self.finish(request).await?;
        info!(name = %metadata.name, %uri, "metadata pinned");
        Ok(uri)
    }
}
