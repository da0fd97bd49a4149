use async_trait::async_trait;
use common::sync::{Blob, ContentStore, ContentStoreError, UserKey};
use reqwest::StatusCode;

use super::blob::{ReadBlobRequest, WriteBlobRequest};
use super::{ApiClient, ApiError};

/// [`ContentStore`] backed by the HTTP blob endpoints.
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    client: ApiClient,
}

impl HttpContentStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

impl From<ApiError> for ContentStoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Reqwest(e) if e.is_decode() => ContentStoreError::Malformed(e.to_string()),
            ApiError::Reqwest(e) => ContentStoreError::Transport(e.to_string()),
            ApiError::UrlParse(e) => ContentStoreError::Transport(e.to_string()),
            ApiError::HttpStatus(StatusCode::NOT_FOUND, body) => ContentStoreError::NotFound(body),
            ApiError::HttpStatus(status, body) => {
                ContentStoreError::Rejected(format!("{}: {}", status, body))
            }
            ApiError::Remote(message) => ContentStoreError::Rejected(message),
            e @ (ApiError::Base64(_) | ApiError::Incomplete(_)) => {
                ContentStoreError::Malformed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn write_blob(
        &self,
        user_key: &UserKey,
        serial: &str,
        blob: Blob,
    ) -> Result<(), ContentStoreError> {
        tracing::debug!("POST {} ({} bytes)", super::blob::WRITE_PATH, blob.content.len());
        let request = WriteBlobRequest::new(user_key.as_str(), serial, &blob);
        let response = self.client.call(request).await?;
        match response.error {
            Some(error) => Err(ApiError::Remote(error).into()),
            None => Ok(()),
        }
    }

    async fn read_blob(&self, user_key: &UserKey, serial: &str) -> Result<Blob, ContentStoreError> {
        tracing::debug!("POST {}", super::blob::READ_PATH);
        let request = ReadBlobRequest {
            user_key: user_key.as_str().to_string(),
            serial: serial.to_string(),
        };
        let response = self.client.call(request).await?;
        Ok(response.into_blob()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            ContentStoreError::from(ApiError::HttpStatus(StatusCode::NOT_FOUND, "gone".into())),
            ContentStoreError::NotFound(_)
        ));
        assert!(matches!(
            ContentStoreError::from(ApiError::HttpStatus(
                StatusCode::INTERNAL_SERVER_ERROR,
                "boom".into()
            )),
            ContentStoreError::Rejected(_)
        ));
        assert!(matches!(
            ContentStoreError::from(ApiError::Remote("bad key".into())),
            ContentStoreError::Rejected(_)
        ));
        assert!(matches!(
            ContentStoreError::from(ApiError::Incomplete("content")),
            ContentStoreError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        // port 9 (discard) on localhost is not serving HTTP
        let url = url::Url::parse("http://127.0.0.1:9").unwrap();
        let store = HttpContentStore::new(ApiClient::new(&url).unwrap());
        let key = UserKey::parse("alice_key").unwrap();

        let result = store.read_blob(&key, "ROOT").await;
        assert!(matches!(result, Err(ContentStoreError::Transport(_))));
    }
}
