/// Runtime configuration for the key price annotator
///
/// Defaults match the Steam Community Market listing page. A handful of fields
/// can be overridden from the environment via [`KeysConfig::from_env`].
use std::time::Duration;

/// Steam price history for the Mann Co. Supply Crate Key (TF2, appid 440)
pub const DEFAULT_PRICE_HISTORY_URL: &str = "https://steamcommunity.com/market/pricehistory/?\
     appid=440&market_hash_name=Mann%20Co.%20Supply%20Crate%20Key";

/// Configuration shared by the fetcher, the synchronizer and the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct KeysConfig {
    /// Endpoint returning the reference price series as JSON
    pub price_history_url: String,
    /// Raw `Cookie` header sent with the fetch (Steam requires a session)
    pub session_cookie: Option<String>,
    /// Timeout applied to the price history request
    pub request_timeout: Duration,
    /// Safety-net full document rescan cadence
    pub rescan_interval: Duration,
    /// Chart tooltip tracking cadence for the floating overlay
    pub overlay_poll_interval: Duration,
    /// Gap kept between the overlay, the tooltip and the viewport edges
    pub overlay_margin: f64,
    /// Classes of tooltips that receive an inline annotation block
    pub inline_classes: Vec<String>,
    /// Classes of chart tooltips tracked by the floating overlay
    pub chart_classes: Vec<String>,
    /// Marker class identifying the injected annotation block
    pub annotation_marker: String,
    /// Fixed identifier of the singleton overlay element
    pub overlay_id: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            price_history_url: DEFAULT_PRICE_HISTORY_URL.to_string(),
            session_cookie: None,
            request_timeout: Duration::from_secs(10),
            rescan_interval: Duration::from_millis(300),
            overlay_poll_interval: Duration::from_millis(100),
            overlay_margin: 8.0,
            inline_classes: vec!["hover_tooltip".to_string(), "market_tooltip".to_string()],
            chart_classes: vec!["jqplot-highlighter-tooltip".to_string()],
            annotation_marker: "scm-keys-annotation".to_string(),
            overlay_id: "scm-keys-overlay".to_string(),
        }
    }
}

impl KeysConfig {
    /// Create a new configuration with a custom price history endpoint
    pub fn new(price_history_url: impl Into<String>) -> Self {
        Self {
            price_history_url: price_history_url.into(),
            ..Default::default()
        }
    }

    /// Default configuration with overrides from environment variables:
    /// `SCM_KEYS_PRICE_URL`, `SCM_KEYS_COOKIE`, `SCM_KEYS_TIMEOUT_MS`,
    /// `SCM_KEYS_RESCAN_MS` and `SCM_KEYS_OVERLAY_POLL_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
        };

        let defaults = Self::default();
        Self {
            price_history_url: lookup("SCM_KEYS_PRICE_URL").unwrap_or(defaults.price_history_url),
            session_cookie: lookup("SCM_KEYS_COOKIE").filter(|cookie| !cookie.trim().is_empty()),
            request_timeout: millis("SCM_KEYS_TIMEOUT_MS").unwrap_or(defaults.request_timeout),
            rescan_interval: millis("SCM_KEYS_RESCAN_MS").unwrap_or(defaults.rescan_interval),
            overlay_poll_interval: millis("SCM_KEYS_OVERLAY_POLL_MS")
                .unwrap_or(defaults.overlay_poll_interval),
            ..defaults
        }
    }

    /// Set the session cookie sent with the price history request
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set rescan interval
    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    /// Set overlay poll interval
    pub fn with_overlay_poll_interval(mut self, interval: Duration) -> Self {
        self.overlay_poll_interval = interval;
        self
    }

    /// Set overlay margin
    pub fn with_overlay_margin(mut self, margin: f64) -> Self {
        self.overlay_margin = margin;
        self
    }

    /// Replace the inline tooltip classes
    pub fn with_inline_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inline_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the chart tooltip classes
    pub fn with_chart_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chart_classes = classes.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_builder() {
        let config = KeysConfig::new("http://localhost:8080/pricehistory")
            .with_session_cookie("steamLoginSecure=abc")
            .with_request_timeout(Duration::from_secs(3))
            .with_rescan_interval(Duration::from_millis(500))
            .with_overlay_poll_interval(Duration::from_millis(50))
            .with_overlay_margin(4.0)
            .with_inline_classes(["hover_tooltip"])
            .with_chart_classes(["chart_tip", "chart_tip_alt"]);

        assert_eq!(config.price_history_url, "http://localhost:8080/pricehistory");
        assert_eq!(config.session_cookie.as_deref(), Some("steamLoginSecure=abc"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.rescan_interval, Duration::from_millis(500));
        assert_eq!(config.overlay_poll_interval, Duration::from_millis(50));
        assert_eq!(config.overlay_margin, 4.0);
        assert_eq!(config.inline_classes, vec!["hover_tooltip"]);
        assert_eq!(config.chart_classes, vec!["chart_tip", "chart_tip_alt"]);
    }

    #[test]
    fn test_default_config() {
        let config = KeysConfig::default();
        assert_eq!(config.price_history_url, DEFAULT_PRICE_HISTORY_URL);
        assert!(config.price_history_url.contains("appid=440&market_hash_name="));
        assert_eq!(config.session_cookie, None);
        assert_eq!(config.rescan_interval, Duration::from_millis(300));
        assert_eq!(config.overlay_margin, 8.0);
        assert_eq!(config.inline_classes, vec!["hover_tooltip", "market_tooltip"]);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCM_KEYS_PRICE_URL", "http://127.0.0.1:9000/history"),
            ("SCM_KEYS_COOKIE", "   "),
            ("SCM_KEYS_RESCAN_MS", "1000"),
            ("SCM_KEYS_OVERLAY_POLL_MS", "not-a-number"),
            ("SCM_KEYS_TIMEOUT_MS", "0"),
        ]);

        let config = KeysConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.price_history_url, "http://127.0.0.1:9000/history");
        assert_eq!(config.session_cookie, None);
        assert_eq!(config.rescan_interval, Duration::from_secs(1));
        assert_eq!(config.overlay_poll_interval, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }
}
