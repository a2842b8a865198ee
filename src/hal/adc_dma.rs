//! ADC + DMA transfer engine
//!
//! Hardware chain for driven acquisition on the STM32G474:
//!
//! ```text
//! TIM2 ──TRGO (update)──▶ ADC1 ──DMA request──▶ DMA1 channel ──▶ write buffer
//!   │
//!   └──ITR1──▶ TIM3 (external clock, ARR = N-1) ──update IRQ──▶ on_buffer_interrupt
//! ```
//!
//! TIM2 paces one conversion per sample period. TIM3 counts those triggers
//! and interrupts once per buffer; the handler checks the DMA transfer
//! flags and forwards to [`DrivenShared`]. Embassy owns the DMA interrupt
//! vectors, so the channel's own interrupt enables stay off.
//!
//! The ADC itself must already be powered, calibrated and enabled (done by
//! `embassy_stm32::adc::Adc::new` in `main`).

use core::sync::atomic::AtomicU16;

use embassy_stm32::pac;

use crate::acquisition::{DrivenShared, TransferEngine};
use crate::config::{dma, pins, sample_clock_divider};
use crate::error::{ConfigError, ConfigResult};
use crate::timing::Timestamp;
use crate::types::SampleRate;

/// Zero-based DMA1 channel index
const DMA_CH: usize = dma::ADC1 as usize - 1;

/// ADC12 external trigger selection for TIM2_TRGO
const EXTSEL_TIM2_TRGO: u8 = 11;

/// Spins allowed for the last conversion to land after the buffer interrupt
const TC_SPIN_LIMIT: u32 = 2_000;

/// Transfer engine driving ADC1 through DMA1 under TIM2/TIM3 control
#[derive(Debug)]
pub struct AdcDmaEngine {
    samples_per_buffer: u16,
    claimed: bool,
}

impl AdcDmaEngine {
    /// Engine for buffers of `samples_per_buffer` samples
    #[must_use]
    pub const fn new(samples_per_buffer: u16) -> Self {
        Self {
            samples_per_buffer,
            claimed: false,
        }
    }

    fn configure_dma(&self) {
        pac::RCC.ahb1enr().modify(|w| {
            w.set_dma1en(true);
            w.set_dmamux1en(true);
        });

        pac::DMAMUX1
            .ccr(DMA_CH)
            .modify(|w| w.set_dmareq_id(dma::ADC1_REQUEST));

        let ch = pac::DMA1.ch(DMA_CH);
        ch.cr().write(|w| {
            w.set_dir(pac::bdma::vals::Dir::FROMPERIPHERAL);
            w.set_psize(pac::bdma::vals::Size::BITS16);
            w.set_msize(pac::bdma::vals::Size::BITS16);
            w.set_minc(true);
            w.set_pinc(false);
            w.set_circ(false);
            w.set_pl(pac::bdma::vals::Pl::VERYHIGH);
        });
        ch.par().write_value(pac::ADC1.dr().as_ptr() as u32);
    }

    fn configure_adc() {
        pac::ADC1.sqr1().modify(|w| {
            w.set_l(0);
            w.set_sq(0, pins::SIGNAL_ADC_CHANNEL);
        });
        pac::ADC1.cfgr().modify(|w| {
            w.set_cont(false);
            w.set_dmaen(true);
            w.set_dmacfg(pac::adc::vals::Dmacfg::CIRCULAR);
            w.set_ovrmod(pac::adc::vals::Ovrmod::OVERWRITE);
            w.set_extsel(EXTSEL_TIM2_TRGO);
            w.set_exten(pac::adc::vals::Exten::RISINGEDGE);
        });
    }

    fn configure_timers(&self, divider: u32) {
        pac::RCC.apb1enr1().modify(|w| {
            w.set_tim2en(true);
            w.set_tim3en(true);
        });

        let pacer = pac::TIM2;
        pacer.cr1().modify(|w| w.set_cen(false));
        pacer.psc().write_value(0);
        pacer.arr().write_value(divider - 1);
        pacer
            .cr2()
            .modify(|w| w.set_mms(pac::timer::vals::Mms::UPDATE));
        pacer.egr().write(|w| w.set_ug(true));

        let counter = pac::TIM3;
        counter.cr1().modify(|w| w.set_cen(false));
        counter.psc().write_value(0);
        counter
            .arr()
            .write(|w| w.set_arr(self.samples_per_buffer.saturating_sub(1)));
        counter.smcr().modify(|w| {
            w.set_ts(pac::timer::vals::Ts::ITR1);
            w.set_sms(pac::timer::vals::Sms::EXT_CLOCK_MODE);
        });
        counter.egr().write(|w| w.set_ug(true));
        counter.sr().modify(|w| w.set_uif(false));
        counter.dier().modify(|w| w.set_uie(true));
    }
}

impl TransferEngine for AdcDmaEngine {
    fn claim(&mut self, rate: SampleRate) -> ConfigResult<()> {
        if self.claimed || pac::DMA1.ch(DMA_CH).cr().read().en() {
            return Err(ConfigError::ChannelUnavailable);
        }
        let divider = sample_clock_divider(rate.as_hz()).ok_or(ConfigError::InvalidSampleRate)?;

        self.configure_dma();
        Self::configure_adc();
        self.configure_timers(divider);
        self.claimed = true;
        Ok(())
    }

    fn arm(&mut self, dest: &[AtomicU16]) {
        let ch = pac::DMA1.ch(DMA_CH);
        ch.cr().modify(|w| w.set_en(false));
        pac::DMA1.ifcr().write(|w| {
            w.set_tcif(DMA_CH, true);
            w.set_teif(DMA_CH, true);
            w.set_htif(DMA_CH, true);
        });
        ch.mar().write_value(dest.as_ptr() as u32);
        ch.ndtr().write(|w| w.set_ndt(dest.len() as u16));
        ch.cr().modify(|w| w.set_en(true));
    }

    fn set_running(&mut self, running: bool) {
        if running {
            pac::TIM3.cnt().write(|w| w.set_cnt(0));
            pac::ADC1.cr().modify(|w| w.set_adstart(true));
            pac::TIM3.cr1().modify(|w| w.set_cen(true));
            pac::TIM2.cr1().modify(|w| w.set_cen(true));
        } else {
            pac::TIM2.cr1().modify(|w| w.set_cen(false));
            pac::TIM3.cr1().modify(|w| w.set_cen(false));
            pac::ADC1.cr().modify(|w| w.set_adstp(true));
        }
    }

    fn abort(&mut self) {
        pac::DMA1.ch(DMA_CH).cr().modify(|w| w.set_en(false));
        pac::DMA1.ifcr().write(|w| w.set_gif(DMA_CH, true));
    }
}

/// Buffer-count interrupt body; call from the TIM3 handler
///
/// Clears the counter flag, waits briefly for the final conversion's DMA
/// transfer and reports completion or fault to `shared`.
pub fn on_buffer_interrupt<const N: usize>(shared: &DrivenShared<AdcDmaEngine, N>, now: Timestamp) {
    pac::TIM3.sr().modify(|w| w.set_uif(false));

    let mut spins = 0;
    loop {
        let isr = pac::DMA1.isr().read();
        if isr.teif(DMA_CH) {
            shared.on_transfer_error();
            return;
        }
        if isr.tcif(DMA_CH) {
            shared.on_transfer_complete(now);
            return;
        }
        spins += 1;
        if spins >= TC_SPIN_LIMIT {
            // Counter and DMA disagree: treat as a transfer fault
            shared.on_transfer_error();
            return;
        }
        core::hint::spin_loop();
    }
}
