use bytes::Bytes;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::form_urlencoded;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::queue::RecordQueue;
use crate::transport::HttpTransport;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("page views require a non-empty page path")]
    MissingPagePath,
}

/// Per-caller context merged into every hit. All fields are explicit
/// overrides; nothing is sniffed from ambient request state.
#[derive(Debug, Clone, Default)]
pub struct Client {
    /// Anonymous client identifier (`cid`).
    pub id: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub locale: Option<String>,
}

impl Client {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Event<'a> {
    pub category: &'a str,
    pub action: &'a str,
    pub label: Option<&'a str>,
    pub value: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageView<'a> {
    /// Path portion of the page URL; should begin with '/'.
    pub path: &'a str,
    pub title: Option<&'a str>,
    pub hostname: Option<&'a str>,
}

/// Facade owning the record queue and the dispatcher lifecycle.
///
/// Construction spawns the dispatcher onto the ambient tokio runtime and the
/// drain loop starts immediately. `shutdown` cancels it and waits for the
/// loop to stop; dropping the tracker cancels without waiting. Either way,
/// records still queued are abandoned: delivery is best-effort.
pub struct Tracker {
    queue: RecordQueue,
    tracking_id: String,
    anonymize_ip: bool,
    cancel: CancellationToken,
    dispatcher_task: Option<JoinHandle<()>>,
}

impl Tracker {
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Self {
        let queue = RecordQueue::new();
        let cancel = CancellationToken::new();
        let transport = HttpTransport::new(&config);
        let dispatcher = Dispatcher::new(queue.clone(), transport, &config, cancel.clone());
        let dispatcher_task = tokio::spawn(dispatcher.run());

        Self {
            queue,
            tracking_id: config.tracking_id,
            anonymize_ip: config.anonymize_ip,
            cancel,
            dispatcher_task: Some(dispatcher_task),
        }
    }

    /// Queue an event hit. Fire-and-forget: the caller never observes the
    /// delivery outcome, which surfaces only through logs.
    pub fn track_event(&self, event: &Event<'_>, client: &Client) {
        let payload = encode_payload(self.base_params(client), event_params(event));
        self.queue.enqueue_one(payload);
    }

    /// Queue a page view hit. The collection endpoint cannot process a page
    /// view without a page path.
    pub fn track_page_view(&self, view: &PageView<'_>, client: &Client) -> Result<(), TrackError> {
        if view.path.trim().is_empty() {
            return Err(TrackError::MissingPagePath);
        }
        let payload = encode_payload(self.base_params(client), page_view_params(view));
        self.queue.enqueue_one(payload);
        Ok(())
    }

    /// Records queued but not yet drained by the dispatcher.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Stop the dispatcher and wait for it to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.dispatcher_task.take() {
            let _ = task.await;
        }
        debug!(abandoned = self.queue.len(), "tracker shut down");
    }

    fn base_params(&self, client: &Client) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("v", "1".to_owned()),
            ("tid", self.tracking_id.clone()),
            ("cid", client.id.clone()),
        ];
        if self.anonymize_ip {
            params.push(("aip", "1".to_owned()));
        }
        if let Some(ua) = &client.user_agent {
            params.push(("ua", ua.clone()));
        }
        if let Some(ip) = &client.ip {
            params.push(("uip", ip.clone()));
        }
        if let Some(locale) = &client.locale {
            params.push(("ul", locale.clone()));
        }
        params
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn event_params(event: &Event<'_>) -> Vec<(&'static str, String)> {
    let mut params = vec![("t", "event".to_owned())];
    if !event.category.is_empty() {
        params.push(("ec", event.category.to_owned()));
    }
    if !event.action.is_empty() {
        params.push(("ea", event.action.to_owned()));
    }
    if let Some(label) = event.label {
        params.push(("el", label.to_owned()));
    }
    if let Some(value) = event.value {
        params.push(("ev", value.to_string()));
    }
    params
}

fn page_view_params(view: &PageView<'_>) -> Vec<(&'static str, String)> {
    let mut params = vec![("t", "pageview".to_owned())];
    if let Some(hostname) = view.hostname {
        params.push(("dh", hostname.to_owned()));
    }
    params.push(("dp", view.path.to_owned()));
    if let Some(title) = view.title {
        params.push(("dt", title.to_owned()));
    }
    params
}

/// Join base and hit parameters into one URL-encoded record.
fn encode_payload(
    base: Vec<(&'static str, String)>,
    hit: Vec<(&'static str, String)>,
) -> Bytes {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in base.into_iter().chain(hit) {
        serializer.append_pair(key, &value);
    }
    Bytes::from(serializer.finish())
}
