use std::time::Duration;
use url::Url;

/// Default venue WebSocket endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://ws.derivws.com/websockets/v3";

/// Default public application id used when the caller has not registered its own.
pub const DEFAULT_APP_ID: u32 = 1089;

/// Shortest API token accepted locally before any network round trip.
pub const MIN_API_TOKEN_LEN: usize = 2;

/// [`TradingSocketClient`](crate::TradingSocketClient) configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Venue WebSocket URL, without the `app_id` query pair
    pub endpoint: Url,
    /// Application id registered with the venue
    pub app_id: u32,
    /// Log every raw inbound and outbound frame
    pub debug: bool,
    /// Upper bound on the socket opening
    pub connect_timeout: Duration,
    /// Budget for the authorize reply. Expiry is logged, the socket is kept
    pub authorize_timeout: Duration,
    /// Budget for proposal, balance and symbol listing replies
    pub request_timeout: Duration,
    /// Budget for buy replies
    pub buy_timeout: Duration,
    /// Interval between heartbeat pings
    pub heartbeat_interval: Duration,
    /// Reconnect attempt `k` waits `reconnect_base_delay * k`
    pub reconnect_base_delay: Duration,
    /// Reconnect attempts before a terminal error is surfaced
    pub max_reconnect_attempts: u32,
    /// Delay before each balance request issued after authorization
    pub post_auth_stagger: Duration,
    /// Capacity of the event broadcast channel
    pub event_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"),
            app_id: DEFAULT_APP_ID,
            debug: false,
            connect_timeout: Duration::from_secs(15),
            authorize_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            buy_timeout: Duration::from_secs(15),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            post_auth_stagger: Duration::from_millis(100),
            event_buffer_size: 1024,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration for the provided endpoint and application id.
    pub fn new(endpoint: Url, app_id: u32) -> Self {
        Self {
            endpoint,
            app_id,
            ..Default::default()
        }
    }

    /// Enable raw frame logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set authorize timeout
    pub fn with_authorize_timeout(mut self, timeout: Duration) -> Self {
        self.authorize_timeout = timeout;
        self
    }

    /// Set the timeout shared by proposal, balance and symbol requests
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set buy timeout
    pub fn with_buy_timeout(mut self, timeout: Duration) -> Self {
        self.buy_timeout = timeout;
        self
    }

    /// Set heartbeat interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the linear reconnect backoff
    pub fn with_reconnect(mut self, base_delay: Duration, max_attempts: u32) -> Self {
        self.reconnect_base_delay = base_delay;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Set post-authorization stagger
    pub fn with_post_auth_stagger(mut self, stagger: Duration) -> Self {
        self.post_auth_stagger = stagger;
        self
    }

    /// Set event channel buffer size
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        self.reconnect_base_delay * attempt
    }

    /// Endpoint with the `app_id` query pair the venue requires.
    pub fn url_with_app_id(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id.to_string());
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new(Url::parse("ws://localhost:8080/ws").unwrap(), 42)
            .with_debug(true)
            .with_heartbeat_interval(Duration::from_secs(15))
            .with_reconnect(Duration::from_millis(500), 3)
            .with_event_buffer_size(64);

        assert_eq!(config.endpoint.as_str(), "ws://localhost:8080/ws");
        assert_eq!(config.app_id, 42);
        assert!(config.debug);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_base_delay, Duration::from_millis(500));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.event_buffer_size, 64);
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert!(!config.debug);
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert!(config.buy_timeout > config.request_timeout);
    }

    #[test]
    fn test_reconnect_delay_is_linear() {
        let config = ClientConfig::default().with_reconnect(Duration::from_millis(100), 5);
        let delays = (1..=5).map(|k| config.reconnect_delay(k)).collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(400),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn test_url_with_app_id() {
        let config = ClientConfig::new(Url::parse("wss://example.com/websockets/v3").unwrap(), 1089);
        assert_eq!(
            config.url_with_app_id().as_str(),
            "wss://example.com/websockets/v3?app_id=1089"
        );
    }
}
