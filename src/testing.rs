use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;

use crate::config::Config;
use crate::transport::{DeliveryError, Transport};

/// Records every payload it is handed; always succeeds.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<Bytes>>,
}

impl Transport for MockTransport {
    async fn send(&self, record: Bytes) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(record);
        Ok(())
    }
}

/// Fails any record whose payload equals `poison`; counts every attempt.
pub struct FailingTransport {
    pub poison: Bytes,
    pub attempts: AtomicUsize,
    pub delivered: Mutex<Vec<Bytes>>,
}

impl FailingTransport {
    pub fn poisoning(poison: &str) -> Self {
        Self {
            poison: Bytes::copy_from_slice(poison.as_bytes()),
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }
}

impl Transport for FailingTransport {
    async fn send(&self, record: Bytes) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if record == self.poison {
            return Err(DeliveryError::Rejected {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        self.delivered.lock().unwrap().push(record);
        Ok(())
    }
}

/// Takes a fixed latency per send and tracks peak concurrency.
pub struct SlowTransport {
    pub latency: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub sent: AtomicUsize,
}

impl SlowTransport {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
        }
    }
}

impl Transport for SlowTransport {
    async fn send(&self, _record: Bytes) -> Result<(), DeliveryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Panics on the magic payload instead of returning an error: a transport
/// violating the failures-as-values contract.
#[derive(Default)]
pub struct PanickingTransport {
    pub delivered: AtomicUsize,
}

impl Transport for PanickingTransport {
    async fn send(&self, record: Bytes) -> Result<(), DeliveryError> {
        if record.as_ref() == b"boom" {
            panic!("transport exploded");
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Never resolves; models an endpoint that has stopped responding entirely.
#[derive(Default)]
pub struct StuckTransport {
    pub started: AtomicUsize,
}

impl Transport for StuckTransport {
    async fn send(&self, _record: Bytes) -> Result<(), DeliveryError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

pub fn dummy_config() -> Config {
    Config {
        endpoint: url::Url::parse("http://localhost:9/collect").unwrap(),
        tracking_id: "XX-12345-6".to_owned(),
        flush_interval: Duration::from_secs(60),
        drain_cap: 20_000,
        page_size: 1_000,
        send_timeout: Duration::from_millis(100),
        anonymize_ip: true,
    }
}
