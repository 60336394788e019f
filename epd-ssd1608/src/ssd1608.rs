use bitflags::bitflags;
use embedded_graphics::{
    prelude::{DrawTarget, OriginDimensions, Size},
    primitives::Rectangle,
    Pixel,
};
use embedded_hal::{
    delay::DelayNs as _,
    digital::{ErrorType as PinErrorType, OutputPin as _, PinState},
    spi::{ErrorType as SpiErrorType, Phase, Polarity},
};

use crate::{
    buffer::{split_low_and_high, TriColor, TriColorBuffer},
    error::ConfigError,
    hw::{BusyHw, BusyWait as _, CommandDataSend as _, CsHw, DcHw, DelayHw, ErrorHw, ResetHw, SpiHw},
    log::{debug, warn_log},
    panel::{PanelVariant, PIXELS_PER_BYTE},
};

/// Length of every waveform LUT sent with [Command::WriteLut].
pub const LUT_LENGTH: usize = 70;

/// LUT for black and white panels.
const LUT_BLACK: [u8; LUT_LENGTH] = [
    0b01001000, 0b10100000, 0b00010000, 0b00010000, 0b00010011, 0b00000000, 0b00000000,
    0b01001000, 0b10100000, 0b10000000, 0b00000000, 0b00000011, 0b00000000, 0b00000000,
    0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000,
    0b01001000, 0b10100101, 0b00000000, 0b10111011, 0b00000000, 0b00000000, 0b00000000,
    0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000,
    0x10, 0x04, 0x04, 0x04, 0x04,
    0x10, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x08, 0x08, 0x10, 0x10,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

/// LUT for black, white and red panels.
const LUT_RED: [u8; LUT_LENGTH] = [
    0b01001000, 0b10100000, 0b00010000, 0b00010000, 0b00010011, 0b00000000, 0b00000000,
    0b01001000, 0b10100000, 0b10000000, 0b00000000, 0b00000011, 0b00000000, 0b00000000,
    0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000,
    0b01001000, 0b10100101, 0b00000000, 0b10111011, 0b00000000, 0b00000000, 0b00000000,
    0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000,
    0x40, 0x0C, 0x20, 0x0C, 0x06,
    0x10, 0x08, 0x04, 0x04, 0x06,
    0x04, 0x08, 0x08, 0x10, 0x10,
    0x02, 0x02, 0x02, 0x40, 0x20,
    0x02, 0x02, 0x02, 0x02, 0x02,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

/// LUT for black, white and yellow panels.
const LUT_YELLOW: [u8; LUT_LENGTH] = [
    0b11111010, 0b10010100, 0b10001100, 0b11000000, 0b11010000, 0b00000000, 0b00000000,
    0b11111010, 0b10010100, 0b00101100, 0b10000000, 0b11100000, 0b00000000, 0b00000000,
    0b11111010, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000, 0b00000000,
    0b11111010, 0b10010100, 0b11111000, 0b10000000, 0b01010000, 0b00000000, 0b11001100,
    0b10111111, 0b01011000, 0b11111100, 0b10000000, 0b11010000, 0b00000000, 0b00010001,
    0x40, 0x10, 0x40, 0x10, 0x08,
    0x08, 0x10, 0x04, 0x04, 0x10,
    0x08, 0x08, 0x03, 0x08, 0x20,
    0x08, 0x04, 0x00, 0x00, 0x10,
    0x10, 0x08, 0x08, 0x00, 0x20,
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

const SOURCE_VOLTAGE_RED: [u8; 3] = [0x30, 0xAC, 0x22];
const SOURCE_VOLTAGE_YELLOW: [u8; 3] = [0x07, 0xAC, 0x32];

const ANALOG_BLOCK_CONTROL_DATA: [u8; 1] = [0x54];
const DIGITAL_BLOCK_CONTROL_DATA: [u8; 1] = [0x3B];
const DUMMY_LINE_PERIOD_DATA: [u8; 1] = [0x1B];
const GATE_LINE_WIDTH_DATA: [u8; 1] = [0x0B];
const VCOM_DATA: [u8; 1] = [0x3C];

const BORDER_BLACK: u8 = 0b0000_0000;
const BORDER_WHITE: u8 = 0b0011_0001;
const BORDER_RED: u8 = 0b0111_0011;
const BORDER_YELLOW: u8 = 0b0011_0011;

pub const RECOMMENDED_SPI_HZ: u32 = 4_000_000; // 4 MHz
/// Use this phase in conjunction with [RECOMMENDED_SPI_POLARITY] so that the EPD can capture data
/// on the rising edge.
pub const RECOMMENDED_SPI_PHASE: Phase = Phase::CaptureOnFirstTransition;
/// Use this polarity in conjunction with [RECOMMENDED_SPI_PHASE] so that the EPD can capture data
/// on the rising edge.
pub const RECOMMENDED_SPI_POLARITY: Polarity = Polarity::IdleLow;
/// The default pin state that indicates the display is busy.
pub const DEFAULT_BUSY_WHEN: PinState = PinState::High;
/// How long the reset pin is held low, and then how long to wait after releasing it.
pub const RESET_DELAY_MS: u32 = 500;
/// How long to wait after [Command::SwReset] before polling the busy pin.
pub const SOFT_RESET_DELAY_MS: u32 = 1000;

/// The colours supported by the attached panel. This selects the LUT, source voltages and border
/// settings used when rendering.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Black, white and red. [TriColor::Accent] is red.
    BlackWhiteRed,
    /// Black, white and yellow. [TriColor::Accent] is yellow.
    BlackWhiteYellow,
    /// Black and white only. The accent plane is still written, but the panel ignores it.
    BlackWhite,
}

impl ColorMode {
    /// Returns the LUT to use for this colour mode.
    pub fn lut(&self) -> &'static [u8; LUT_LENGTH] {
        match self {
            ColorMode::BlackWhiteRed => &LUT_RED,
            ColorMode::BlackWhiteYellow => &LUT_YELLOW,
            ColorMode::BlackWhite => &LUT_BLACK,
        }
    }

    /// Returns the data for [Command::SetSourceDrivingVoltage], if this mode sets it.
    pub fn source_voltage(&self) -> Option<&'static [u8; 3]> {
        match self {
            ColorMode::BlackWhiteRed => Some(&SOURCE_VOLTAGE_RED),
            ColorMode::BlackWhiteYellow => Some(&SOURCE_VOLTAGE_YELLOW),
            ColorMode::BlackWhite => None,
        }
    }

    /// Returns the [Command::BorderWaveformControl] setting for the given border colour.
    ///
    /// There is no accent border in [ColorMode::BlackWhite], so that combination returns `None`.
    pub fn border_waveform(&self, border: TriColor) -> Option<u8> {
        match (border, *self) {
            (TriColor::Black, _) => Some(BORDER_BLACK),
            (TriColor::White, _) => Some(BORDER_WHITE),
            (TriColor::Accent, ColorMode::BlackWhiteRed) => Some(BORDER_RED),
            (TriColor::Accent, ColorMode::BlackWhiteYellow) => Some(BORDER_YELLOW),
            (TriColor::Accent, ColorMode::BlackWhite) => None,
        }
    }
}

/// Low-level commands for the SSD1608. You probably want to use [Ssd1608::render] for most
/// operations, but can send commands directly with [Ssd1608::send] for low-level control or
/// experimentation.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Sets the number of gate lines (3 bytes: low byte and high byte of `rows - 1`, then scan
    /// direction flags).
    DriverOutputControl = 0x01,
    /// Sets the source driving voltages (VSH1, VSH2, VSL).
    SetSourceDrivingVoltage = 0x04,
    /// Changes the auto-increment behaviour of the address counter. See [DataEntryMode].
    DataEntryModeSetting = 0x11,
    /// Resets all commands and parameters to default values (except deep sleep mode).
    SwReset = 0x12,
    /// Activates the display update sequence. This operation must not be interrupted.
    MasterActivation = 0x20,
    /// Configures the display update sequence for use with [Command::MasterActivation]. See
    /// [UpdateSequence].
    DisplayUpdateControl2 = 0x22,
    /// Writes data to the black/white RAM, auto-incrementing the address counter.
    WriteRam = 0x24,
    /// Writes data to the accent colour RAM, auto-incrementing the address counter.
    WriteAltRam = 0x26,
    /// Writes to the VCOM register.
    WriteVcom = 0x2C,
    /// Writes the LUT register ([LUT_LENGTH] bytes).
    WriteLut = 0x32,
    /// Sets the number of dummy lines per gate.
    SetDummyLinePeriod = 0x3A,
    /// Sets the gate line width.
    SetGateLineWidth = 0x3B,
    /// Register to configure the behaviour of the border.
    BorderWaveformControl = 0x3C,
    /// Sets the start and end positions of the X axis for the auto-incrementing address counter.
    /// Start and end are inclusive, and counted in bytes (8 pixels each).
    SetRamXStartEnd = 0x44,
    /// Sets the start and end positions of the Y axis for the auto-incrementing address counter.
    /// Start and end are inclusive.
    SetRamYStartEnd = 0x45,
    /// Sets the current x coordinate of the address counter, in bytes.
    SetRamX = 0x4E,
    /// Sets the current y coordinate of the address counter.
    SetRamY = 0x4F,
    /// Magic analog block configuration.
    AnalogBlockControl = 0x74,
    /// Magic digital block configuration.
    DigitalBlockControl = 0x7E,
}

impl Command {
    /// Returns the register address for this command.
    fn register(&self) -> u8 {
        *self as u8
    }
}

bitflags! {
    /// Data sent with [Command::DataEntryModeSetting].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataEntryMode: u8 {
        const XIncrement = 0b001;
        const YIncrement = 0b010;
        // Update the address counter in the Y direction first.
        const YFirst = 0b100;
    }
}

bitflags! {
    /// Steps run by the controller when activated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateSequence: u8 {
        const EnableClock = 0x80;
        const EnableAnalog = 0x40;
        const LoadTemperature = 0x20;
        const LoadLut = 0x10;
        const InitialDisplay = 0x08;
        const PatternDisplay = 0x04;
        const DisableAnalog = 0x02;
        const DisableClock = 0x01;
    }
}

/// Auto-increment X and Y, moving in the X direction first.
const DATA_ENTRY_MODE: DataEntryMode = DataEntryMode::XIncrement.union(DataEntryMode::YIncrement);

/// Full update: power up, display the RAM contents, and power down again.
const ACTIVATION_SEQUENCE: UpdateSequence = UpdateSequence::EnableClock
    .union(UpdateSequence::EnableAnalog)
    .union(UpdateSequence::PatternDisplay)
    .union(UpdateSequence::DisableAnalog)
    .union(UpdateSequence::DisableClock);

/// The plane length used by [Ssd1608Panel250x122].
pub const BUFFER_LENGTH_250X122: usize = PanelVariant::Size250x122.buffer_length();
/// The plane length used by [Ssd1608Panel400x300].
pub const BUFFER_LENGTH_400X300: usize = PanelVariant::Size400x300.buffer_length();

/// An [Ssd1608] driving a [PanelVariant::Size250x122] panel.
pub type Ssd1608Panel250x122<HW> = Ssd1608<HW, BUFFER_LENGTH_250X122>;
/// An [Ssd1608] driving a [PanelVariant::Size400x300] panel.
pub type Ssd1608Panel400x300<HW> = Ssd1608<HW, BUFFER_LENGTH_400X300>;

/// Controls an SSD1608 based tri-colour e-paper display.
///
/// The display keeps its own framebuffer. Draw into it with [Ssd1608::set_pixel] and friends, or
/// through [DrawTarget], then call [Ssd1608::render] to reinitialise the panel and show the frame.
/// The framebuffer is kept between renders.
///
/// `L` is the length of each framebuffer plane; prefer the [Ssd1608Panel250x122] and
/// [Ssd1608Panel400x300] aliases, which choose it for you.
pub struct Ssd1608<HW, const L: usize> {
    hw: HW,
    buffer: TriColorBuffer<L>,
    color_mode: ColorMode,
    border: TriColor,
}

impl<HW, const L: usize> Ssd1608<HW, L> {
    /// Creates a display with a cleared framebuffer and a white border. This doesn't touch the
    /// hardware.
    pub fn new(hw: HW, variant: PanelVariant, color_mode: ColorMode) -> Result<Self, ConfigError> {
        Ok(Ssd1608 {
            hw,
            buffer: TriColorBuffer::new(variant)?,
            color_mode,
            border: TriColor::White,
        })
    }

    pub fn variant(&self) -> PanelVariant {
        self.buffer.variant()
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// The visible width of the panel.
    pub fn width(&self) -> u32 {
        self.buffer.size().width
    }

    /// The visible height of the panel.
    pub fn height(&self) -> u32 {
        self.buffer.size().height
    }

    pub fn border(&self) -> TriColor {
        self.border
    }

    /// Sets the border colour. This is applied on the next [Ssd1608::render].
    ///
    /// [TriColor::Accent] has no effect in [ColorMode::BlackWhite]; the border command is
    /// skipped entirely.
    pub fn set_border(&mut self, color: TriColor) {
        self.border = color;
    }

    pub fn buffer(&self) -> &TriColorBuffer<L> {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TriColorBuffer<L> {
        &mut self.buffer
    }

    /// See [TriColorBuffer::set_pixel].
    pub fn set_pixel(&mut self, x: u32, y: u32, value: TriColor) {
        self.buffer.set_pixel(x, y, value);
    }

    /// See [TriColorBuffer::set_pixels].
    pub fn set_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, value: TriColor) {
        self.buffer.set_pixels(x, y, width, height, value);
    }

    /// See [TriColorBuffer::draw_bitmap].
    pub fn draw_bitmap(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        value: TriColor,
        bitmap: &[u8],
    ) {
        self.buffer.draw_bitmap(x, y, width, height, value, bitmap);
    }

    /// Drops the framebuffer and returns the hardware.
    pub fn release(self) -> HW {
        self.hw
    }
}

impl<HW, const L: usize> Ssd1608<HW, L>
where
    HW: BusyHw + CsHw + DcHw + ResetHw + DelayHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Cs as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Reset as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>,
{
    /// Send the following command and data to the display. This doesn't wait for the display to
    /// be ready.
    pub fn send(
        &mut self,
        spi: &mut HW::Spi,
        command: Command,
        data: &[u8],
    ) -> Result<(), HW::Error> {
        self.hw.send(spi, command.register(), data)
    }

    /// Hardware reset the display.
    pub fn reset(&mut self) -> Result<(), HW::Error> {
        debug!("Resetting EPD");
        self.hw.reset().set_low()?;
        self.hw.delay().delay_ms(RESET_DELAY_MS);
        self.hw.reset().set_high()?;
        self.hw.delay().delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Resets and initialises the display, writes the framebuffer to it, and refreshes it.
    ///
    /// This blocks until the display has taken the new frame. The busy pin is polled without a
    /// timeout, so a display that never becomes ready blocks forever.
    pub fn render(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        debug!("Rendering {:?} frame", self.color_mode);
        self.reset()?;
        self.soft_reset(spi)?;
        self.configure(spi)?;
        self.write_planes(spi)?;
        self.hw.wait_while_busy()?;
        self.activate(spi)
    }

    fn soft_reset(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        self.send(spi, Command::SwReset, &[])?;
        self.hw.delay().delay_ms(SOFT_RESET_DELAY_MS);
        self.hw.wait_while_busy()
    }

    fn configure(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        debug!("Configuring EPD");
        let d = self.buffer.variant().dimensions();
        let (last_row_low, last_row_high) = split_low_and_high(d.rows - 1);
        let last_col_byte = (d.cols / PIXELS_PER_BYTE - 1) as u8;

        self.send(spi, Command::AnalogBlockControl, &ANALOG_BLOCK_CONTROL_DATA)?;
        self.send(spi, Command::DigitalBlockControl, &DIGITAL_BLOCK_CONTROL_DATA)?;
        self.send(
            spi,
            Command::DriverOutputControl,
            &[last_row_low, last_row_high, 0x00],
        )?;
        self.send(spi, Command::SetDummyLinePeriod, &DUMMY_LINE_PERIOD_DATA)?;
        self.send(spi, Command::SetGateLineWidth, &GATE_LINE_WIDTH_DATA)?;
        self.send(spi, Command::DataEntryModeSetting, &[DATA_ENTRY_MODE.bits()])?;

        self.send(spi, Command::SetRamXStartEnd, &[0x00, last_col_byte])?;
        self.send(
            spi,
            Command::SetRamYStartEnd,
            &[0x00, 0x00, last_row_low, last_row_high],
        )?;

        self.send(spi, Command::WriteVcom, &VCOM_DATA)?;

        let mode = self.color_mode;
        if let Some(voltage) = mode.source_voltage() {
            self.send(spi, Command::SetSourceDrivingVoltage, voltage)?;
        }
        self.send(spi, Command::WriteLut, mode.lut())?;

        match mode.border_waveform(self.border) {
            Some(border) => self.send(spi, Command::BorderWaveformControl, &[border])?,
            None => {
                warn_log!("No {:?} border in {:?} mode", self.border, mode);
            }
        }
        Ok(())
    }

    /// Moves the RAM address counter back to the origin.
    fn reset_cursor(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        self.send(spi, Command::SetRamX, &[0x00])?;
        self.send(spi, Command::SetRamY, &[0x00, 0x00])
    }

    fn write_planes(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        debug!("Writing framebuffer");
        self.reset_cursor(spi)?;
        self.hw.send(
            spi,
            Command::WriteRam.register(),
            transfer_payload(self.buffer.primary()),
        )?;

        self.reset_cursor(spi)?;
        self.hw.send(
            spi,
            Command::WriteAltRam.register(),
            transfer_payload(self.buffer.accent()),
        )
    }

    fn activate(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        debug!("Activating display update");
        // The update sequence goes out with MasterActivation itself, followed by a bare activation.
        self.send(spi, Command::MasterActivation, &[ACTIVATION_SEQUENCE.bits()])?;
        self.send(spi, Command::MasterActivation, &[])
    }
}

/// The controller is sent every byte of a plane except the last.
fn transfer_payload(plane: &[u8]) -> &[u8] {
    &plane[..plane.len().saturating_sub(1)]
}

impl<HW, const L: usize> OriginDimensions for Ssd1608<HW, L> {
    fn size(&self) -> Size {
        self.buffer.size()
    }
}

impl<HW, const L: usize> DrawTarget for Ssd1608<HW, L> {
    type Color = TriColor;

    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.buffer.draw_iter(pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.buffer.fill_solid(area, color)
    }
}
