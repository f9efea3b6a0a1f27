use std::time::Duration;

use ti2_frame::{ChannelConfig, DEFAULT_EVENT_TIMEOUT};

/// Default quiet period after which the status is considered stable.
pub const DEFAULT_IDLE_DURATION: Duration = Duration::from_millis(500);

/// Per-device engine configuration.
#[derive(Debug, Clone)]
pub struct MicroscopeConfig {
    /// Command channel configuration (response timeout and deadline policy).
    pub channel: ChannelConfig,
    /// Time allowed for a status event to arrive. Default: 15 s.
    pub event_timeout: Duration,
    /// Quiet period used by [`Microscope::stable_status`](crate::Microscope::stable_status).
    pub idle_duration: Duration,
}

impl Default for MicroscopeConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            idle_duration: DEFAULT_IDLE_DURATION,
        }
    }
}
