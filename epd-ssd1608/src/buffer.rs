use core::convert::Infallible;

use embedded_graphics::{
    pixelcolor::{BinaryColor, PixelColor},
    prelude::{Dimensions, DrawTarget, OriginDimensions, Size},
    primitives::Rectangle,
    Pixel,
};

use crate::{
    error::ConfigError,
    panel::{PanelVariant, PIXELS_PER_BYTE},
};

/// The colours a tri-colour panel can show.
///
/// Each colour is stored as a bit pair across the two planes of a [TriColorBuffer]:
///
/// | colour   | primary | accent |
/// |----------|---------|--------|
/// | `White`  | 1       | 0      |
/// | `Black`  | 0       | 0      |
/// | `Accent` | 1       | 1      |
///
/// `Accent` is red or yellow depending on the panel; see [crate::ssd1608::ColorMode].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriColor {
    #[default]
    White,
    Black,
    Accent,
}

impl PixelColor for TriColor {
    type Raw = ();
}

impl From<BinaryColor> for TriColor {
    /// `On` is white and `Off` is black, matching the rest of this crate.
    fn from(color: BinaryColor) -> Self {
        match color {
            BinaryColor::On => TriColor::White,
            BinaryColor::Off => TriColor::Black,
        }
    }
}

/// Splits a 16-bit value into its low and high bytes, in that order.
pub(crate) fn split_low_and_high(value: u16) -> (u8, u8) {
    let [low, high] = value.to_le_bytes();
    (low, high)
}

/// A pair of bit-packed planes holding a full frame in the controller's RAM layout.
///
/// Each byte holds 8 pixels of a RAM row, most significant bit first. Pixel writes apply the
/// panel's rotation, so callers always work in visible coordinates.
///
/// `L` must equal [PanelVariant::buffer_length] for the panel.
#[derive(Clone)]
pub struct TriColorBuffer<const L: usize> {
    variant: PanelVariant,
    primary: [u8; L],
    accent: [u8; L],
}

impl<const L: usize> TriColorBuffer<L> {
    /// Creates a zeroed buffer for the given panel.
    ///
    /// ```
    /// use epd_ssd1608::buffer::TriColorBuffer;
    /// use epd_ssd1608::panel::PanelVariant;
    ///
    /// const LENGTH: usize = PanelVariant::Size250x122.buffer_length();
    /// let buffer = TriColorBuffer::<LENGTH>::new(PanelVariant::Size250x122).unwrap();
    /// assert_eq!(buffer.primary().len(), LENGTH);
    /// ```
    pub fn new(variant: PanelVariant) -> Result<Self, ConfigError> {
        let expected = variant.buffer_length();
        if expected != L {
            return Err(ConfigError::BufferLength {
                expected,
                actual: L,
            });
        }
        Ok(Self {
            variant,
            primary: [0; L],
            accent: [0; L],
        })
    }

    pub fn variant(&self) -> PanelVariant {
        self.variant
    }

    /// The black/white plane.
    pub fn primary(&self) -> &[u8] {
        &self.primary
    }

    /// The accent colour plane.
    pub fn accent(&self) -> &[u8] {
        &self.accent
    }

    /// Both planes, primary first.
    pub fn planes(&self) -> [&[u8]; 2] {
        [&self.primary, &self.accent]
    }

    /// Resolves a visible coordinate to its byte index and bit mask within each plane.
    ///
    /// Coordinates are accepted up to and including the panel's width and height. Every byte index
    /// is offset by one, so the first byte of each plane is never addressed. Positions that land
    /// beyond the end of the planes resolve to `None`.
    pub fn ram_position(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        let d = self.variant.dimensions();
        let width = u32::from(d.width);
        let height = u32::from(d.height);
        if x > width || y > height {
            return None;
        }

        let (row, col) = if self.variant.is_rotated() {
            (x, width.checked_sub(1)?.checked_sub(y)?)
        } else {
            (y, x)
        };

        let pixels_per_byte = u32::from(PIXELS_PER_BYTE);
        let bytes_per_row = L / usize::from(d.rows);
        let byte = (col / pixels_per_byte) as usize + 1 + row as usize * bytes_per_row;
        if byte >= L {
            return None;
        }
        Some((byte, 0x80 >> (col % pixels_per_byte)))
    }

    /// Sets a single pixel. Out of range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: TriColor) {
        let Some((byte, mask)) = self.ram_position(x, y) else {
            return;
        };

        match value {
            TriColor::White => {
                self.primary[byte] |= mask;
                self.accent[byte] &= !mask;
            }
            TriColor::Black => {
                self.primary[byte] &= !mask;
                self.accent[byte] &= !mask;
            }
            TriColor::Accent => {
                self.primary[byte] |= mask;
                self.accent[byte] |= mask;
            }
        }
    }

    /// Sets every pixel in the `width` x `height` rectangle whose top left corner is at (x, y).
    pub fn set_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, value: TriColor) {
        for px in x..x.saturating_add(width) {
            for py in y..y.saturating_add(height) {
                self.set_pixel(px, py, value);
            }
        }
    }

    /// Draws a bitmap of `width` columns, each stored as one byte. Bit `k` (least significant
    /// first) of a column is the pixel `k` rows below `y`. Only set bits are drawn, in `value`.
    ///
    /// At most 8 rows can be drawn per column; `height` is capped at 8, and columns missing from
    /// `bitmap` are skipped.
    pub fn draw_bitmap(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        value: TriColor,
        bitmap: &[u8],
    ) {
        let height = height.min(8);
        for (col, column) in (0..width).zip(bitmap.iter()) {
            for row in 0..height {
                if (column >> row) & 0x01 == 1 {
                    self.set_pixel(x.saturating_add(col), y.saturating_add(row), value);
                }
            }
        }
    }
}

impl<const L: usize> OriginDimensions for TriColorBuffer<L> {
    fn size(&self) -> Size {
        let d = self.variant.dimensions();
        Size::new(u32::from(d.width), u32::from(d.height))
    }
}

impl<const L: usize> DrawTarget for TriColorBuffer<L> {
    type Color = TriColor;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let size = self.size();
        for Pixel(point, color) in pixels.into_iter() {
            // Unlike set_pixel, points on the right and bottom edges are outside the drawable area.
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x >= size.width || y >= size.height {
                continue;
            }
            self.set_pixel(x, y, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let drawable_area = self.bounding_box().intersection(area);
        if drawable_area.size.width == 0 || drawable_area.size.height == 0 {
            return Ok(());
        }

        // The intersection lies within the bounding box, so the corner is never negative.
        self.set_pixels(
            drawable_area.top_left.x as u32,
            drawable_area.top_left.y as u32,
            drawable_area.size.width,
            drawable_area.size.height,
            color,
        );
        Ok(())
    }
}
