//! Request and response bodies for the blob endpoints.
//!
//! Content travels base64 encoded; timestamps are RFC 3339 strings.

use base64::Engine;
use chrono::{DateTime, Utc};
use common::sync::Blob;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiError, ApiRequest};

pub const WRITE_PATH: &str = "/api/v0/blob/write";
pub const READ_PATH: &str = "/api/v0/blob/read";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteBlobRequest {
    pub user_key: String,
    pub serial: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WriteBlobRequest {
    pub fn new(user_key: &str, serial: &str, blob: &Blob) -> Self {
        Self {
            user_key: user_key.to_string(),
            serial: serial.to_string(),
            content: base64::engine::general_purpose::STANDARD.encode(&blob.content),
            created_at: blob.created_at,
            updated_at: blob.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteBlobResponse {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiRequest for WriteBlobRequest {
    type Response = WriteBlobResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(WRITE_PATH)?;
        Ok(client.post(full_url).json(&self))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadBlobRequest {
    pub user_key: String,
    pub serial: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadBlobResponse {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReadBlobResponse {
    pub fn into_blob(self) -> Result<Blob, ApiError> {
        if let Some(error) = self.error {
            return Err(ApiError::Remote(error));
        }
        let content = self.content.ok_or(ApiError::Incomplete("content"))?;
        let content = base64::engine::general_purpose::STANDARD.decode(content)?;
        Ok(Blob {
            content: content.into(),
            created_at: self.created_at.ok_or(ApiError::Incomplete("created_at"))?,
            updated_at: self.updated_at.ok_or(ApiError::Incomplete("updated_at"))?,
        })
    }
}

impl ApiRequest for ReadBlobRequest {
    type Response = ReadBlobResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(READ_PATH)?;
        Ok(client.post(full_url).json(&self))
    }
}
