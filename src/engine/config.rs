//! Engine Configuration

/// Result count used when a query passes no explicit count
pub const DEFAULT_COUNT: usize = 10;

/// Similarity engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Results returned when a query gives no count
    pub default_count: usize,

    /// Number of scan worker threads (0 = auto-detect)
    pub scan_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_COUNT,
            scan_workers: 0, // Auto-detect (typically num_cores)
        }
    }
}

impl EngineConfig {
    /// Set the default result count
    pub fn with_default_count(mut self, count: usize) -> Self {
        self.default_count = count;
        self
    }

    /// Set the scan worker count (0 = auto-detect)
    pub fn with_scan_workers(mut self, workers: usize) -> Self {
        self.scan_workers = workers;
        self
    }
}
