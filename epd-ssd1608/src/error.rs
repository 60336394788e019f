use thiserror::Error as ThisError;

/// Errors raised while configuring a display, before any hardware is touched.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum ConfigError {
    /// No supported panel has the requested visible size.
    #[error("no SSD1608 panel is {width}x{height}")]
    UnknownPanel { width: u32, height: u32 },
    /// The buffer length chosen for the display doesn't fit the panel's RAM geometry.
    #[error("panel needs {expected} bytes per plane, but the buffer holds {actual}")]
    BufferLength { expected: usize, actual: usize },
}
