/// Tunables that were module-level constants in the original implementation.
///
/// Passed explicitly to [`crate::flow_table::FlowTable::new`] instead of being
/// read from globals, so a single process can in principle run more than one
/// engine with different policies.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Packets more than this far apart (in seconds) force the old flow to
    /// expire and a new one to take its place under the same key.
    pub flow_timeout: f64,
    /// Gaps larger than this (in seconds) close the current active sub-flow
    /// and open an idle period.
    pub idle_threshold: f64,
}

impl Config {
    pub const DEFAULT_FLOW_TIMEOUT_SECS: f64 = 600.0;
    pub const DEFAULT_IDLE_THRESHOLD_SECS: f64 = 1.0;

    pub fn new(flow_timeout: f64, idle_threshold: f64) -> Self {
        Config {
            flow_timeout,
            idle_threshold,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            flow_timeout: Self::DEFAULT_FLOW_TIMEOUT_SECS,
            idle_threshold: Self::DEFAULT_IDLE_THRESHOLD_SECS,
        }
    }
}
