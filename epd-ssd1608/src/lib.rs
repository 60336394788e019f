//! This crate provides a blocking driver for tri-colour e-paper displays built on the SSD1608
//! controller.
//!
//! It is built on top of `embedded-hal` and `embedded-graphics`, making it compatible with a wide
//! range of embedded platforms.
//!
//! ## Overview
//!
//! - [`ssd1608::Ssd1608`]: owns the hardware and a full framebuffer. Draw into it, either pixel by
//!   pixel or with `embedded-graphics`, then call [`ssd1608::Ssd1608::render`] to reset and
//!   configure the panel, transfer the frame, and refresh the display.
//!
//! - [`hw`]: small traits that give the driver access to the chip select, data/command, reset and
//!   busy pins, and a delay. You implement these for your chosen peripherals. The SPI bus is
//!   passed into each call that needs it, so it can be shared with other devices.
//!
//! Additionally, the crate provides:
//!
//! - `buffer` module: the two-plane [`buffer::TriColorBuffer`], which maps visible coordinates to
//!   the controller's RAM layout and implements `embedded_graphics::DrawTarget`.
//! - `panel` module: the supported panels and their geometry.
//!
//! ```rust,ignore
//! let mut epd = Ssd1608Panel250x122::new(hw, PanelVariant::Size250x122, ColorMode::BlackWhiteRed)?;
//! epd.set_pixels(0, 0, 250, 122, TriColor::White);
//! epd.set_pixels(10, 10, 40, 20, TriColor::Accent);
//! epd.set_border(TriColor::Black);
//! epd.render(&mut spi)?;
//! ```
#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod error;
pub mod hw;
pub mod panel;
pub mod ssd1608;

#[cfg(test)]
mod fake;
mod log;

pub use buffer::TriColor;
pub use error::ConfigError;
pub use panel::PanelVariant;
pub use ssd1608::{ColorMode, Ssd1608, Ssd1608Panel250x122, Ssd1608Panel400x300};
