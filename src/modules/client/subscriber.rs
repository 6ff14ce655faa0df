use std::time::Duration;

use eventsource_client as es;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::watch;

use super::api_client::{ApiClient, ClientError};
use super::location_view::LocationView;
use crate::core::config::ClientConfig;
use crate::features::locations::dtos::LocationResponseDto;
use crate::features::locations::events::LocationEvent;
use crate::shared::constants::{EVENT_LOCATIONS_UPDATE, EVENT_PING};
use crate::shared::types::ApiResponse;

/// Exponential backoff between stream reconnects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            max_attempts,
        }
    }

    /// Close on the first failure and never reconnect
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Some(0))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.reconnect_initial_delay,
            config.reconnect_max_delay,
            config.reconnect_max_attempts,
        )
    }

    /// Whether reconnect number `attempt` (0-based) may run
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Delay before reconnect number `attempt` (0-based), doubling up to the cap
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

type SseStream = BoxStream<'static, Result<es::SSE, ClientError>>;

/// Keeps a [`LocationView`] in sync with the server's location stream
pub struct LocationSubscriber {
    client: ApiClient,
    policy: ReconnectPolicy,
    view: watch::Sender<LocationView>,
}

impl LocationSubscriber {
    const STREAM_ENDPOINT: &'static str = "/locations/stream";
    const LIST_ENDPOINT: &'static str = "/locations";

    pub fn new(client: ApiClient, policy: ReconnectPolicy) -> Self {
        let (view, _) = watch::channel(LocationView::new());
        Self {
            client,
            policy,
            view,
        }
    }

    /// Receiver notified on every change to the view
    pub fn subscribe(&self) -> watch::Receiver<LocationView> {
        self.view.subscribe()
    }

    /// Current contents of the view
    pub fn view(&self) -> LocationView {
        self.view.borrow().clone()
    }

    /// Follow the stream until reconnects are exhausted
    ///
    /// Each (re)connect opens the stream first and then refetches the full
    /// list, so no event published in between is lost.
    pub async fn run(&self) -> Result<(), ClientError> {
        let mut attempt: u32 = 0;

        loop {
            let error = match self.connect().await {
                Ok(stream) => {
                    attempt = 0;
                    tracing::info!("Location stream connected ({} locations)", self.view.borrow().len());
                    match self.consume(stream).await {
                        Some(e) => {
                            tracing::warn!("Location stream broke: {}", e);
                            e
                        }
                        None => {
                            tracing::info!("Location stream closed by server");
                            ClientError::Stream("stream closed by server".to_string())
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to location stream: {}", e);
                    e
                }
            };

            if !self.policy.allows(attempt) {
                tracing::error!("Giving up on location stream after {} reconnect attempts", attempt);
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            attempt += 1;
            tracing::debug!("Reconnecting in {:?} (attempt {})", delay, attempt);
            tokio::time::sleep(delay).await;
        }
    }

    /// Open the stream, wait for its first frame, then load the full list
    ///
    /// The server queues a ping before anything else, so the first frame
    /// proves the connection is registered for broadcasts.
    async fn connect(&self) -> Result<SseStream, ClientError> {
        let mut stream = self.client.open_stream(Self::STREAM_ENDPOINT)?;

        match tokio::time::timeout(self.client.timeout(), stream.next()).await {
            Ok(Some(Ok(first))) => self.handle_frame(first),
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => {
                return Err(ClientError::Stream("stream closed before first frame".to_string()))
            }
            Err(_) => return Err(ClientError::Timeout),
        }

        let response: ApiResponse<Vec<LocationResponseDto>> =
            self.client.get(Self::LIST_ENDPOINT).await?;
        let locations = response.data.unwrap_or_default();
        self.view.send_modify(|view| view.replace_all(locations));

        Ok(stream)
    }

    /// Apply frames until the stream ends; returns the error that ended it, if any
    async fn consume(&self, mut stream: SseStream) -> Option<ClientError> {
        loop {
            match stream.next().await {
                Some(Ok(frame)) => self.handle_frame(frame),
                Some(Err(e)) => return Some(e),
                None => return None,
            }
        }
    }

    fn handle_frame(&self, frame: es::SSE) {
        match frame {
            es::SSE::Event(event) => self.handle_event(&event.event_type, &event.data),
            es::SSE::Comment(_) => tracing::trace!("Stream keep-alive"),
        }
    }

    fn handle_event(&self, event_type: &str, data: &str) {
        match event_type {
            EVENT_LOCATIONS_UPDATE => match serde_json::from_str::<LocationEvent>(data) {
                Ok(event) => {
                    tracing::debug!(kind = ?event.kind, id = ?event.target_id(), "Location event");
                    self.view.send_if_modified(|view| view.apply(event));
                }
                Err(e) => tracing::warn!("Skipping undecodable location event: {}", e),
            },
            EVENT_PING => tracing::trace!("Stream ping"),
            other => tracing::debug!("Ignoring stream event '{}'", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::locations::dtos::{CreateLocationDto, UpdateLocationDto};
    use crate::features::locations::repositories::InMemoryLocationRepository;
    use crate::features::locations::routes::public_routes;
    use crate::features::locations::{LocationService, LocationsState};
    use crate::modules::realtime::Broadcaster;
    use crate::shared::test_helpers::spawn_server;
    use std::sync::Arc;

    fn dto(name: &str) -> CreateLocationDto {
        serde_json::from_value(serde_json::json!({ "name": name, "lat": 1.5, "lng": 2.5 }))
            .unwrap()
    }

    async fn wait_until(
        rx: &mut watch::Receiver<LocationView>,
        predicate: impl FnMut(&LocationView) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("view did not reach expected state")
            .unwrap();
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy =
            ReconnectPolicy::new(Duration::from_millis(100), Duration::from_millis(1000), None);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(64), Duration::from_millis(1000));
        assert!(policy.allows(u32::MAX));
    }

    #[test]
    fn test_disabled_policy_never_reconnects() {
        let policy = ReconnectPolicy::disabled();
        assert!(!policy.allows(0));
    }

    #[tokio::test]
    async fn test_view_follows_server_mutations() {
        let broadcaster = Arc::new(Broadcaster::new(16));
        let service = Arc::new(LocationService::new(
            Arc::new(InMemoryLocationRepository::new()),
            broadcaster.clone(),
            Duration::from_secs(5),
        ));
        let existing = service.create(dto("Existing")).await.unwrap();

        let base = spawn_server(public_routes(LocationsState {
            service: service.clone(),
            broadcaster: broadcaster.clone(),
            keep_alive: Duration::from_secs(15),
        }))
        .await;
        let client = ApiClient::new(&ClientConfig {
            base_url: format!("{}/api", base),
            ..ClientConfig::default()
        })
        .unwrap();

        let subscriber = Arc::new(LocationSubscriber::new(client, ReconnectPolicy::disabled()));
        let mut rx = subscriber.subscribe();
        let runner = subscriber.clone();
        let task = tokio::spawn(async move { runner.run().await });

        wait_until(&mut rx, |view| view.get(&existing.id).is_some()).await;
        while broadcaster.connection_count() == 0 {
            tokio::task::yield_now().await;
        }

        let added = service.create(dto("Added")).await.unwrap();
        wait_until(&mut rx, |view| view.len() == 2).await;

        let update = UpdateLocationDto {
            name: Some("Renamed".to_string()),
            ..UpdateLocationDto::default()
        };
        service.update(added.id, update).await.unwrap();
        wait_until(&mut rx, |view| {
            view.get(&added.id).map(|l| l.name.as_str()) == Some("Renamed")
        })
        .await;

        service.delete(existing.id).await.unwrap();
        wait_until(&mut rx, |view| view.len() == 1).await;

        let snapshot = subscriber.view().snapshot();
        assert_eq!(snapshot[0].id, added.id);

        task.abort();
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&ClientConfig {
            base_url: format!("http://{}/api", addr),
            timeout: Duration::from_secs(1),
            ..ClientConfig::default()
        })
        .unwrap();
        let policy = ReconnectPolicy::new(Duration::from_millis(10), Duration::from_millis(20), Some(2));
        let subscriber = LocationSubscriber::new(client, policy);

        let started = std::time::Instant::now();
        let result = tokio::time::timeout(Duration::from_secs(5), subscriber.run())
            .await
            .unwrap();

        assert!(matches!(result, Err(ClientError::Stream(_))), "got {result:?}");
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(subscriber.view().is_empty());
    }
}
