//! HTTP client for the remote content store.

pub mod blob;
#[allow(clippy::module_inception)]
mod client;
mod error;
mod store;

pub use client::ApiClient;
pub use error::ApiError;
pub use store::HttpContentStore;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}
