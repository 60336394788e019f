use embedded_graphics::prelude::Size;

use crate::error::ConfigError;

/// Number of pixels packed into each byte of controller RAM.
pub const PIXELS_PER_BYTE: u16 = 8;

/// Visible and RAM geometry of a panel.
///
/// `cols` and `rows` describe the controller's RAM layout, which doesn't have to match the visible
/// `width` and `height`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelDimensions {
    pub width: u16,
    pub height: u16,
    pub cols: u16,
    pub rows: u16,
}

/// The panels supported by this driver.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelVariant {
    /// 250x122 panel. Its RAM is mounted rotated by 90 degrees: the 250 visible columns map to
    /// RAM rows.
    Size250x122,
    /// 400x300 panel, with RAM laid out the same way as the visible pixels.
    Size400x300,
}

impl PanelVariant {
    pub const fn dimensions(&self) -> PanelDimensions {
        match self {
            PanelVariant::Size250x122 => PanelDimensions {
                width: 250,
                height: 122,
                cols: 136,
                rows: 250,
            },
            PanelVariant::Size400x300 => PanelDimensions {
                width: 400,
                height: 300,
                cols: 400,
                rows: 300,
            },
        }
    }

    /// The number of bytes in each plane of the framebuffer.
    pub const fn buffer_length(&self) -> usize {
        let d = self.dimensions();
        (d.cols / PIXELS_PER_BYTE) as usize * d.rows as usize
    }

    /// Whether the visible pixels are rotated relative to the controller RAM.
    pub const fn is_rotated(&self) -> bool {
        matches!(self, PanelVariant::Size250x122)
    }

    /// Finds the panel with the given visible size.
    pub fn from_size(width: u32, height: u32) -> Result<Self, ConfigError> {
        match (width, height) {
            (250, 122) => Ok(PanelVariant::Size250x122),
            (400, 300) => Ok(PanelVariant::Size400x300),
            _ => Err(ConfigError::UnknownPanel { width, height }),
        }
    }
}

impl TryFrom<Size> for PanelVariant {
    type Error = ConfigError;

    fn try_from(size: Size) -> Result<Self, Self::Error> {
        PanelVariant::from_size(size.width, size.height)
    }
}
