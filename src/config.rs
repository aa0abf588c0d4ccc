use std::path::PathBuf;

use async_log::Level;

/// Startup knobs for [`crate::server::Server`]. The defaults mirror the
/// values the stock binary runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Idle-connection timeout in milliseconds; 0 disables the timer.
    pub timeout_ms: u64,
    pub open_linger: bool,
    pub worker_threads: usize,
    pub open_log: bool,
    pub log_level: Level,
    /// Log queue capacity; 0 makes the sink write synchronously.
    pub log_queue_capacity: usize,
    /// Static-asset root. `None` resolves to `<cwd>/resources`.
    pub root_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 12345,
            timeout_ms: 60_000,
            open_linger: false,
            worker_threads: 6,
            open_log: true,
            log_level: Level::Info,
            log_queue_capacity: 1024,
            root_dir: None,
        }
    }
}
