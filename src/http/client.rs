//! Configured HTTP client that reads responses into the requested type

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};

use super::FromResponse;
use crate::config::ClientConfig;
use crate::error::{Result, ScrapeError};
use crate::uri::IntoAbsoluteUrl;

/// A configured HTTP client that reads responses into the requested type
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    client: Client,
    max_content_size: usize,
}

impl ScrapeClient {
    /// Build a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.gzip)
            .build()?;

        Ok(Self::with_client(client, config.max_content_size))
    }

    /// Wrap an existing client
    pub fn with_client(client: Client, max_content_size: usize) -> Self {
        Self {
            client,
            max_content_size,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn max_content_size(&self) -> usize {
        self.max_content_size
    }

    /// Start a request to an absolute URI
    pub fn request(&self, method: Method, uri: impl IntoAbsoluteUrl) -> Result<RequestBuilder> {
        Ok(self.client.request(method, uri.into_absolute_url()?))
    }

    /// Send `request` and read the response as `T`
    pub async fn send<T: FromResponse>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        tracing::debug!("{} {}", response.status(), response.url());
        T::from_response(response, Some(self.max_content_size)).await
    }

    /// Like [`send`](Self::send), giving up with [`ScrapeError::Cancelled`]
    /// as soon as `cancel` completes
    pub async fn send_cancellable<T, C>(&self, request: RequestBuilder, cancel: C) -> Result<T>
    where
        T: FromResponse,
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::debug!("Request cancelled");
                Err(ScrapeError::Cancelled)
            }
            result = self.send::<T>(request) => result,
        }
    }

    pub async fn get<T: FromResponse>(&self, uri: impl IntoAbsoluteUrl) -> Result<T> {
        self.send(self.request(Method::GET, uri)?).await
    }

    pub async fn post<T: FromResponse>(&self, uri: impl IntoAbsoluteUrl) -> Result<T> {
        self.send(self.request(Method::POST, uri)?).await
    }

    pub async fn put<T: FromResponse>(&self, uri: impl IntoAbsoluteUrl) -> Result<T> {
        self.send(self.request(Method::PUT, uri)?).await
    }

    pub async fn patch<T: FromResponse>(&self, uri: impl IntoAbsoluteUrl) -> Result<T> {
        self.send(self.request(Method::PATCH, uri)?).await
    }

    pub async fn delete<T: FromResponse>(&self, uri: impl IntoAbsoluteUrl) -> Result<T> {
        self.send(self.request(Method::DELETE, uri)?).await
    }
}
