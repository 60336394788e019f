use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType as PinErrorType, InputPin, OutputPin, PinState},
    spi::{ErrorType as SpiErrorType, SpiBus},
};

use crate::log::trace;

/// How long to sleep between polls of the busy pin.
pub const BUSY_POLL_INTERVAL_MS: u32 = 10;

/// Provides access to a shared error type.
///
/// Drivers rely on this trait to provide a single Error type that supports [From] conversions
/// from all the hardware-specific error types.
pub trait ErrorHw {
    type Error;
}

/// Describes the SPI hardware to use for interacting with the EPD.
///
/// The bus itself is passed into each call that talks to the display, so that it can be shared
/// with other devices. Chip select is driven by the driver through [CsHw].
pub trait SpiHw {
    type Spi: SpiBus;
}

/// Provides access to the Chip Select pin. The display is selected while this pin is low.
pub trait CsHw {
    type Cs: OutputPin;

    fn cs(&mut self) -> &mut Self::Cs;
}

/// Provides access to the Data/Command pin for EPD control.
pub trait DcHw {
    type Dc: OutputPin;

    fn dc(&mut self) -> &mut Self::Dc;
}

/// Provides access to the Reset pin for EPD control.
pub trait ResetHw {
    type Reset: OutputPin;

    fn reset(&mut self) -> &mut Self::Reset;
}

/// Provides access to the Busy pin for EPD status monitoring.
pub trait BusyHw {
    type Busy: InputPin;

    fn busy(&mut self) -> &mut Self::Busy;

    /// Indicates which state of the busy pin indicates that it's busy.
    ///
    /// This is user-configurable, rather than enforced by the display driver, to allow the user to
    /// use more unexpected wiring configurations. SSD1608 boards normally report busy when high,
    /// see [crate::ssd1608::DEFAULT_BUSY_WHEN].
    fn busy_when(&self) -> PinState;
}

/// Provides access to delay functionality for EPD timing control.
pub trait DelayHw {
    type Delay: DelayNs;

    fn delay(&mut self) -> &mut Self::Delay;
}

/// Provides "wait" support for hardware with a busy state.
pub(crate) trait BusyWait: ErrorHw {
    /// Polls the busy pin until the display reports that it's ready, sleeping for
    /// [BUSY_POLL_INTERVAL_MS] between polls.
    ///
    /// There is no timeout: this blocks forever if the busy pin never clears.
    fn wait_while_busy(&mut self) -> Result<(), Self::Error>;
}

/// Provides the ability to send <command> then <data> style communications.
pub(crate) trait CommandDataSend: SpiHw + ErrorHw {
    /// Sends the command byte, followed by the data bytes if there are any.
    ///
    /// This does not wait for the busy pin. Callers synchronise explicitly with
    /// [BusyWait::wait_while_busy] where the controller requires it.
    fn send(&mut self, spi: &mut Self::Spi, command: u8, data: &[u8])
        -> Result<(), Self::Error>;
}

impl<HW> BusyWait for HW
where
    HW: BusyHw + DelayHw + ErrorHw,
    <HW as ErrorHw>::Error: From<<HW::Busy as PinErrorType>::Error>,
{
    fn wait_while_busy(&mut self) -> Result<(), HW::Error> {
        let busy_when = self.busy_when();
        loop {
            let busy = self.busy();
            let is_busy = match busy_when {
                PinState::High => busy.is_high()?,
                PinState::Low => busy.is_low()?,
            };
            if !is_busy {
                return Ok(());
            }
            trace!("Waiting for busy EPD");
            self.delay().delay_ms(BUSY_POLL_INTERVAL_MS);
        }
    }
}

/// Writes one chip-select framed chunk to the bus.
fn write_selected<HW>(hw: &mut HW, spi: &mut HW::Spi, bytes: &[u8]) -> Result<(), HW::Error>
where
    HW: CsHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error> + From<<HW::Cs as PinErrorType>::Error>,
{
    hw.cs().set_low()?;
    spi.write(bytes)?;
    spi.flush()?;
    hw.cs().set_high()?;
    Ok(())
}

impl<HW> CommandDataSend for HW
where
    HW: CsHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>
        + From<<HW::Cs as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>,
{
    fn send(
        &mut self,
        spi: &mut Self::Spi,
        command: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        trace!("Sending EPD command: {:?}", command);

        self.dc().set_low()?;
        write_selected(self, spi, &[command])?;

        if !data.is_empty() {
            self.dc().set_high()?;
            write_selected(self, spi, data)?;
        }

        Ok(())
    }
}
