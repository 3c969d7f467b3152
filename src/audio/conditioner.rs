//! Per-frame signal cleanup applied before voice activity detection.
//!
//! Conditioning never fails: degenerate input (an all-zero frame) passes
//! through each step and comes out as a zero frame.

use crate::defaults;
use serde::{Deserialize, Serialize};

/// Configuration for frame conditioning. Every step is independently
/// toggleable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Subtract the frame mean (DC offset).
    pub remove_dc: bool,
    /// Apply a first-order high-pass above `high_pass_cutoff_hz`.
    pub high_pass: bool,
    /// High-pass cutoff frequency in Hz.
    pub high_pass_cutoff_hz: f32,
    /// Apply pre-emphasis with `pre_emphasis_coeff`.
    pub pre_emphasis: bool,
    /// Pre-emphasis coefficient.
    pub pre_emphasis_coeff: f32,
    /// Scale the frame so its peak hits `peak_target`.
    pub normalize: bool,
    /// Peak normalization target (fraction of full scale).
    pub peak_target: f32,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            remove_dc: true,
            high_pass: true,
            high_pass_cutoff_hz: defaults::HIGH_PASS_CUTOFF_HZ,
            pre_emphasis: true,
            pre_emphasis_coeff: defaults::PRE_EMPHASIS_COEFF,
            normalize: true,
            peak_target: defaults::PEAK_TARGET,
        }
    }
}

/// Applies DC removal, rumble high-pass, pre-emphasis and peak normalization
/// to each frame, in that order.
pub struct FrameConditioner {
    config: ConditionerConfig,
    sample_rate: u32,
}

impl FrameConditioner {
    /// Creates a conditioner for the given sample rate.
    pub fn new(config: ConditionerConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
        }
    }

    /// Conditions a frame in place.
    pub fn condition(&self, samples: &mut [f32]) {
        if samples.is_empty() {
            return;
        }

        if self.config.remove_dc {
            remove_dc(samples);
        }
        if self.config.high_pass {
            high_pass(samples, self.config.high_pass_cutoff_hz, self.sample_rate);
        }
        if self.config.pre_emphasis {
            pre_emphasis(samples, self.config.pre_emphasis_coeff);
        }
        if self.config.normalize {
            normalize_peak(samples, self.config.peak_target);
        }
    }
}

/// Subtracts the mean from the frame.
fn remove_dc(samples: &mut [f32]) {
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    for s in samples.iter_mut() {
        *s -= mean;
    }
}

/// First-order high-pass with zero initial state per frame.
///
/// y[n] = a * (y[n-1] + x[n] - x[n-1])
fn high_pass(samples: &mut [f32], cutoff_hz: f32, sample_rate: u32) {
    if sample_rate == 0 || cutoff_hz <= 0.0 {
        return;
    }
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / sample_rate as f32;
    let alpha = rc / (rc + dt);

    let mut prev_x = samples[0];
    let mut prev_y = samples[0];
    for s in samples.iter_mut().skip(1) {
        let x = *s;
        let y = alpha * (prev_y + x - prev_x);
        *s = y;
        prev_x = x;
        prev_y = y;
    }
}

/// First-order difference: y[0] = x[0], y[n] = x[n] - coeff * x[n-1].
fn pre_emphasis(samples: &mut [f32], coeff: f32) {
    for i in (1..samples.len()).rev() {
        samples[i] -= coeff * samples[i - 1];
    }
}

/// Scales the frame so its absolute peak hits `target`.
///
/// All-zero frames are left untouched.
fn normalize_peak(samples: &mut [f32], target: f32) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        let scale = target / peak;
        for s in samples.iter_mut() {
            *s *= scale;
        }
    }
}
