//! Hardware Abstraction Layer
//!
//! Provides the STM32G474 implementations of the acquisition and timing
//! traits. This module isolates hardware-specific code; everything above it
//! builds and tests on the host.

pub mod adc;
pub mod adc_dma;
pub mod timer;
