use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collection endpoint rejected record: {status}")]
    Rejected { status: StatusCode },
}

/// Sends one serialized record to the collection endpoint.
///
/// Network and protocol failures must come back as `DeliveryError` values,
/// not panics; the dispatcher treats a panicking transport as a broken
/// contract and abandons the current tick.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, record: Bytes) -> impl Future<Output = Result<(), DeliveryError>> + Send + '_;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(&self, record: Bytes) -> impl Future<Output = Result<(), DeliveryError>> + Send + '_ {
        (**self).send(record)
    }
}

/// POSTs each record to the configured collect endpoint as a pre-encoded
/// form body. Records are opaque here: whatever produced them already did
/// the URL encoding.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        // The TLS provider is process-global; a second install returns Err
        // and is ignored.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(config.send_timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, record: Bytes) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/x-www-form-urlencoded")
            .body(record)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: resp.status(),
            })
        }
    }
}
