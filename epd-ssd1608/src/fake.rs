//! Recording hardware for driver tests.
//!
//! Every pin change, delay and SPI write is appended to a shared log, so tests can check both the
//! low-level framing and the command/data transactions it carries.

use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc};

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorType as PinErrorType, InputPin, OutputPin, PinState},
    spi::{ErrorType as SpiErrorType, SpiBus},
};

use crate::{
    hw::{BusyHw, CsHw, DcHw, DelayHw, ErrorHw, ResetHw, SpiHw},
    ssd1608::DEFAULT_BUSY_WHEN,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Cs(bool),
    Dc(bool),
    Reset(bool),
    BusyRead(bool),
    DelayMs(u32),
    DelayNs(u32),
    Write(Vec<u8>),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// Groups SPI writes into (command, data) pairs using the data/command pin level at the time.
pub fn transactions(log: &[Event]) -> Vec<(u8, Vec<u8>)> {
    let mut dc_high = false;
    let mut sent: Vec<(u8, Vec<u8>)> = Vec::new();
    for event in log {
        match event {
            Event::Dc(level) => dc_high = *level,
            Event::Write(bytes) if dc_high => {
                let (_, data) = sent.last_mut().expect("data sent before any command");
                data.extend_from_slice(bytes);
            }
            Event::Write(bytes) => {
                assert_eq!(bytes.len(), 1, "commands are a single byte");
                sent.push((bytes[0], Vec::new()));
            }
            _ => {}
        }
    }
    sent
}

pub struct FakeSpi {
    log: Log,
}

impl FakeSpi {
    pub fn log(&self) -> Log {
        self.log.clone()
    }
}

impl SpiErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiBus for FakeSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Write(words.to_vec()));
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)?;
        read.fill(0);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.write(words)?;
        words.fill(0);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct FakeOutput {
    log: Log,
    event: fn(bool) -> Event,
}

impl PinErrorType for FakeOutput {
    type Error = Infallible;
}

impl OutputPin for FakeOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push((self.event)(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push((self.event)(true));
        Ok(())
    }
}

/// Reads the queued levels in order, then reads low forever.
pub struct FakeBusy {
    log: Log,
    levels: VecDeque<bool>,
}

impl PinErrorType for FakeBusy {
    type Error = Infallible;
}

impl InputPin for FakeBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let level = self.levels.pop_front().unwrap_or(false);
        self.log.borrow_mut().push(Event::BusyRead(level));
        Ok(level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_high()?)
    }
}

pub struct FakeDelay {
    log: Log,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(Event::DelayNs(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::DelayMs(ms));
    }
}

pub struct FakeHw {
    log: Log,
    cs: FakeOutput,
    dc: FakeOutput,
    reset: FakeOutput,
    busy: FakeBusy,
    delay: FakeDelay,
}

impl FakeHw {
    /// Creates the hardware and its SPI bus. The busy pin reads `busy_levels` in order, then
    /// reads idle.
    pub fn new(busy_levels: &[bool]) -> (Self, FakeSpi) {
        let log: Log = Rc::default();
        let output = |event: fn(bool) -> Event| FakeOutput {
            log: log.clone(),
            event,
        };
        let hw = FakeHw {
            cs: output(Event::Cs),
            dc: output(Event::Dc),
            reset: output(Event::Reset),
            busy: FakeBusy {
                log: log.clone(),
                levels: busy_levels.iter().copied().collect(),
            },
            delay: FakeDelay { log: log.clone() },
            log: log.clone(),
        };
        (hw, FakeSpi { log })
    }

    pub fn log(&self) -> Log {
        self.log.clone()
    }
}

impl ErrorHw for FakeHw {
    type Error = Infallible;
}

impl SpiHw for FakeHw {
    type Spi = FakeSpi;
}

impl CsHw for FakeHw {
    type Cs = FakeOutput;

    fn cs(&mut self) -> &mut Self::Cs {
        &mut self.cs
    }
}

impl DcHw for FakeHw {
    type Dc = FakeOutput;

    fn dc(&mut self) -> &mut Self::Dc {
        &mut self.dc
    }
}

impl ResetHw for FakeHw {
    type Reset = FakeOutput;

    fn reset(&mut self) -> &mut Self::Reset {
        &mut self.reset
    }
}

impl BusyHw for FakeHw {
    type Busy = FakeBusy;

    fn busy(&mut self) -> &mut Self::Busy {
        &mut self.busy
    }

    fn busy_when(&self) -> PinState {
        DEFAULT_BUSY_WHEN
    }
}

impl DelayHw for FakeHw {
    type Delay = FakeDelay;

    fn delay(&mut self) -> &mut Self::Delay {
        &mut self.delay
    }
}
