//! Centralized configuration for the scheduler.
//!
//! All tunable parameters live here to avoid hard-coded values scattered
//! throughout the codebase.

/// Number of pieces the scheduler keeps in flight ahead of the playback
/// position.
pub const DEFAULT_WINDOW_SIZE: usize = 8;

/// Default size of the header/footer metadata zones in bytes.
pub const DEFAULT_HEADER_SIZE: u64 = 128 * 1024;

/// Tunables for the sequential window scheduler.
///
/// The header zone is handled by a separate prioritization mechanism that
/// runs before or alongside this scheduler; its size is carried here because
/// the footer thresholds default to it and both mechanisms share one config
/// surface.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of pieces in the moving window.
    pub window_size: usize,
    /// Leading bytes assumed to hold container metadata.
    pub header_size: u64,
    /// Trailing bytes assumed to hold container metadata.
    pub footer_size: u64,
    /// Trailing bytes treated as "near the footer" on seek. Seeks landing
    /// here are served incrementally instead of rebuilding the window.
    /// Must cover at least the footer zone; smaller values are widened.
    pub possible_footer_size: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            header_size: DEFAULT_HEADER_SIZE,
            footer_size: DEFAULT_HEADER_SIZE,
            possible_footer_size: DEFAULT_HEADER_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Sets the window size in pieces.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets the metadata zone thresholds. Footer and possible-footer sizes
    /// follow the header size unless overridden afterwards.
    pub fn with_header_size(mut self, header_size: u64) -> Self {
        self.header_size = header_size;
        self.footer_size = header_size;
        self.possible_footer_size = header_size;
        self
    }

    /// Sets the footer zone size in bytes.
    pub fn with_footer_size(mut self, footer_size: u64) -> Self {
        self.footer_size = footer_size;
        self
    }

    /// Sets the possible-footer zone size in bytes.
    pub fn with_possible_footer_size(mut self, possible_footer_size: u64) -> Self {
        self.possible_footer_size = possible_footer_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.window_size, 8);
        assert_eq!(config.header_size, 128 * 1024);
        assert_eq!(config.footer_size, config.header_size);
        assert_eq!(config.possible_footer_size, config.header_size);
    }

    #[test]
    fn test_header_size_drives_footer_defaults() {
        let config = SchedulerConfig::default().with_header_size(64 * 1024);
        assert_eq!(config.footer_size, 64 * 1024);
        assert_eq!(config.possible_footer_size, 64 * 1024);

        let config = config.with_possible_footer_size(256 * 1024);
        assert_eq!(config.footer_size, 64 * 1024);
        assert_eq!(config.possible_footer_size, 256 * 1024);
    }
}
