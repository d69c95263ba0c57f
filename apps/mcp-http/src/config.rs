use std::time::Duration;

/// Server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Hide and refuse mutating tools.
    pub read_only: bool,
    /// Sessions idle longer than this are torn down.
    pub session_idle_timeout: Duration,
    /// How often the expiry sweep runs.
    pub sweep_interval: Duration,
    /// Keep-alive cadence on open push streams.
    pub ping_interval: Duration,
    /// Outbound queue capacity per push client.
    pub event_queue_capacity: usize,
    /// Upper bound on a single RPC handler.
    pub handler_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_only: false,
            session_idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            ping_interval: Duration::from_secs(30),
            event_queue_capacity: crate::gateway::client::DEFAULT_QUEUE_CAPACITY,
            handler_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("MCP_HTTP_HOST")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.host),
            // `PORT` wins over `MCP_HTTP_PORT`.
            port: parsed_var("PORT")
                .or_else(|| parsed_var("MCP_HTTP_PORT"))
                .unwrap_or(defaults.port),
            read_only: std::env::var("MCP_HTTP_READ_ONLY")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.read_only),
            session_idle_timeout: secs_var("MCP_HTTP_SESSION_IDLE_SECS")
                .unwrap_or(defaults.session_idle_timeout),
            sweep_interval: secs_var("MCP_HTTP_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            ping_interval: secs_var("MCP_HTTP_PING_INTERVAL_SECS")
                .unwrap_or(defaults.ping_interval),
            event_queue_capacity: parsed_var("MCP_HTTP_EVENT_QUEUE_CAPACITY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.event_queue_capacity),
            handler_timeout: secs_var("MCP_HTTP_HANDLER_TIMEOUT_SECS")
                .unwrap_or(defaults.handler_timeout),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Zero is rejected: every duration here drives an interval or a deadline.
fn secs_var(name: &str) -> Option<Duration> {
    parsed_var::<u64>(name)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
