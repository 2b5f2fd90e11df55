//! Server configuration

use std::time::Duration;

/// Default TCP address of the server
pub const DEFAULT_BIND: &str = "127.0.0.1:50121";

/// Default for [`ServerConfig::max_geometry_bytes`]
pub const DEFAULT_MAX_GEOMETRY_BYTES: usize = 256 * 1024 * 1024;

/// Shortest and longest tick interval accepted by [`ServerConfig::with_tick_rate`]
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(3600);

/// Configuration for the connection loop
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Time between ticks (default: 60 Hz)
    pub tick_interval: Duration,
    /// Largest accepted frame in bytes (default: 64 MiB)
    pub max_frame_len: usize,
    /// Characters of a frame shown in debug logs (default: 200)
    pub preview_len: usize,
    /// Largest mesh a geometry header or legacy buffer may declare (default: 256 MiB)
    pub max_geometry_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(1.0 / 60.0),
            max_frame_len: 64 * 1024 * 1024,
            preview_len: 200,
            max_geometry_bytes: DEFAULT_MAX_GEOMETRY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Ticks per second; non-positive rates keep the default
    ///
    /// The interval is clamped to 1 ms ..= 1 h.
    pub fn with_tick_rate(mut self, hz: f64) -> Self {
        if hz > 0.0 && hz.is_finite() {
            let secs = (1.0 / hz).clamp(MIN_TICK_INTERVAL.as_secs_f64(), MAX_TICK_INTERVAL.as_secs_f64());
            self.tick_interval = Duration::from_secs_f64(secs);
        }
        self
    }
}
