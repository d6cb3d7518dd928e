use std::time::Duration;

/// Timing knobs for the init/show orchestration.
///
/// Every value is in milliseconds. Missing keys fall back to the defaults when
/// the struct is deserialized from a host-provided document.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BridgeCfg {
    pub activity_poll_interval_ms: u64,
    pub activity_poll_max_attempts: u32,
    pub init_callback_timeout_ms: u64,
    pub consent_update_timeout_ms: u64,
    pub cache_retry_delay_ms: u64,
    /// Gives the host renderer time to release its surface before the SDK's
    /// own activity takes the window.
    pub show_delay_ms: u64,
    pub auto_cache: bool,
}

impl Default for BridgeCfg {
    fn default() -> Self {
        Self {
            activity_poll_interval_ms: 100,
            activity_poll_max_attempts: 50,
            init_callback_timeout_ms: 15_000,
            consent_update_timeout_ms: 5_000,
            cache_retry_delay_ms: 3_000,
            show_delay_ms: 250,
            auto_cache: true,
        }
    }
}

impl BridgeCfg {
    #[inline]
    pub fn activity_poll_interval(&self) -> Duration {
        Duration::from_millis(self.activity_poll_interval_ms)
    }

    #[inline]
    pub fn init_callback_timeout(&self) -> Duration {
        Duration::from_millis(self.init_callback_timeout_ms)
    }

    #[inline]
    pub fn consent_update_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_update_timeout_ms)
    }

    #[inline]
    pub fn cache_retry_delay(&self) -> Duration {
        Duration::from_millis(self.cache_retry_delay_ms)
    }

    #[inline]
    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.show_delay_ms)
    }
}

/// SDK log verbosity requested at the boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LogLevel {
    Debug,
    Verbose,
    #[default]
    None,
}

impl LogLevel {
    /// Lenient parse: `"debug"` and `"verbose"` (any case, surrounding
    /// whitespace ignored), everything else is `None`.
    pub fn parse(raw: &str) -> Self {
        let lo = raw.trim().to_ascii_lowercase();
        match lo.as_str() {
            "debug" => LogLevel::Debug,
            "verbose" => LogLevel::Verbose,
            _ => LogLevel::None,
        }
    }

    /// Constant name on the SDK's log-level enum.
    pub const fn enum_constant(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
            LogLevel::None => "NONE",
        }
    }
}
