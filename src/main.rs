//! Spectrum Analyzer Main Application
//!
//! Entry point for the STM32G474-based spectrum analyzer firmware.
//! Initializes hardware, selects the acquisition mode and runs the
//! frame loop forever.

#![no_std]
#![no_main]

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_stm32::adc::{Adc, AdcChannel, Resolution, SampleTime};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use {defmt_rtt as _, panic_probe as _};

use specan_firmware::hal::adc::PolledAdc;
use specan_firmware::hal::adc_dma::{on_buffer_interrupt, AdcDmaEngine};
use specan_firmware::hal::timer::EmbassyClock;
use specan_firmware::pipeline::PeakLogSink;
use specan_firmware::prelude::*;

/// Shared state of the driven acquisition path, reachable from the TIM3 handler
static DRIVEN: DrivenShared<AdcDmaEngine, FFT_SIZE> =
    DrivenShared::new(AdcDmaEngine::new(FFT_SIZE as u16));

/// Buffer-complete interrupt for driven acquisition
#[interrupt]
fn TIM3() {
    on_buffer_interrupt(&DRIVEN, EmbassyClock.now());
}

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Spectrum Analyzer Firmware v{}", env!("CARGO_PKG_VERSION"));

    // Initialize STM32G474 peripherals with default clock configuration
    let p = embassy_stm32::init(embassy_stm32::Config::default());
    info!("Peripherals initialized");

    let config = AnalyzerConfig::default();
    let rate = match config.sample_rate() {
        Ok(rate) => rate,
        Err(e) => halt(e),
    };
    info!(
        "{} mode, {} Hz (timer gives {} Hz), {}-point FFT, {} fps",
        config.mode,
        rate.as_hz(),
        achievable_sample_rate(rate.as_hz()).unwrap_or(0),
        FFT_SIZE,
        config.frame_rate_fps
    );

    let mut pipeline = match Pipeline::new(&config, EmbassyClock, PeakLogSink::from_config(&config)) {
        Ok(pipeline) => pipeline,
        Err(e) => halt(e),
    };

    match config.mode {
        AcquisitionMode::Polled => {
            if let Err(e) = config.polled_frame_budget_ok(FFT_SIZE) {
                warn!("{}: frame rate will fall below target", e);
            }
            let source = PolledAdc::new(p.ADC1, p.PA0.degrade_adc());
            let mut sampler = match PolledSampler::<_, _, FFT_SIZE>::init(source, EmbassyClock, rate) {
                Ok(sampler) => sampler,
                Err(e) => halt(e),
            };
            pipeline.run(&mut sampler)
        }
        AcquisitionMode::Driven => {
            // Power up and calibrate the converter; the engine takes it from here.
            // `adc` must outlive the loop, which never returns.
            let mut adc = Adc::new(p.ADC1);
            adc.set_resolution(Resolution::BITS12);
            adc.set_sample_time(SampleTime::CYCLES12_5);
            let mut input = p.PA0.degrade_adc();
            let _ = adc.blocking_read(&mut input);

            let mut sampler = match DrivenSampler::init(&DRIVEN, rate) {
                Ok(sampler) => sampler,
                Err(e) => halt(e),
            };

            interrupt::TIM3.set_priority(Priority::P1);
            interrupt::TIM3.unpend();
            // SAFETY: the TIM3 handler only touches `DRIVEN`, which is fully
            // initialized and synchronizes through atomics and critical sections.
            unsafe { interrupt::TIM3.enable() };

            pipeline.run(&mut sampler)
        }
    }
}

/// Report a fatal configuration error and stop
fn halt(err: ConfigError) -> ! {
    error!("configuration error: {}", err);
    loop {
        cortex_m::asm::wfi();
    }
}
