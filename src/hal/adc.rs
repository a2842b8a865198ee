//! ADC Driver
//!
//! Single-conversion ADC access for polled acquisition. Each `read` starts
//! one blocking conversion on the signal input.

use embassy_stm32::adc::{Adc, AnyAdcChannel, Resolution, SampleTime};
use embassy_stm32::peripherals::ADC1;

use crate::acquisition::SampleSource;
use crate::error::{ConfigError, ConfigResult};
use crate::types::SampleRate;

/// Highest rate the blocking read loop can keep up with
pub const MAX_POLLED_RATE_HZ: u32 = 250_000;

/// Signal-input ADC read one conversion at a time
pub struct PolledAdc<'d> {
    adc: Adc<'d, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl<'d> PolledAdc<'d> {
    /// Wrap ADC1 and the signal-input channel
    #[must_use]
    pub fn new(adc: ADC1, channel: AnyAdcChannel<ADC1>) -> Self {
        Self {
            adc: Adc::new(adc),
            channel,
        }
    }
}

impl SampleSource for PolledAdc<'_> {
    fn configure(&mut self, rate: SampleRate) -> ConfigResult<()> {
        if rate.as_hz() > MAX_POLLED_RATE_HZ {
            return Err(ConfigError::InvalidSampleRate);
        }
        self.adc.set_resolution(Resolution::BITS12);
        // Shortest sampling window that still settles a 75 ohm source
        self.adc.set_sample_time(SampleTime::CYCLES12_5);
        Ok(())
    }

    fn read(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.channel)
    }
}
