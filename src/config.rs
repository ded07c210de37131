//! Ambient, driver-wide configuration knobs.

use std::time::Duration;

/// Settings that govern the driver's behavior but are not part of any one
/// program: the un-hosted wait poll cadence and the id-range stride
/// reserved for each sub-graph build.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub wait_poll_interval: Duration,
    pub subgraph_id_stride: u64,
}

impl DriverConfig {
    pub const DEFAULT_SUBGRAPH_ID_STRIDE: u64 = 1000;

    #[must_use]
    pub fn with_wait_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_subgraph_id_stride(mut self, stride: u64) -> Self {
        self.subgraph_id_stride = stride.max(1);
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            wait_poll_interval: Duration::from_millis(100),
            subgraph_id_stride: Self::DEFAULT_SUBGRAPH_ID_STRIDE,
        }
    }
}
