//! Filter bank for signal conditioning
//!
//! **Module Organization**:
//! - `iir` - biquad low/high/band-pass and notch sections, causal and zero-phase
//! - `smoothing` - moving average, moving median, Savitzky-Golay, DC offset removal
//! - `goertzel` - single-tone energy and mains interference detection
//! - `denoise` - adaptive MAD-based soft-threshold denoiser

pub mod denoise;
pub mod goertzel;
pub mod iir;
pub mod smoothing;

pub use denoise::{adaptive_denoise, soft_threshold, DEFAULT_DENOISE_SCALES_MS};
pub use goertzel::{detect_powerline, goertzel_power, tone_fraction};
pub use iir::{bandpass, filter, filtfilt, highpass, lowpass, notch, IirDesign};
pub use smoothing::{moving_average, moving_median, remove_dc_offset, savitzky_golay};
