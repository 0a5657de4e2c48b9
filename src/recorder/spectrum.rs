//! Voice-band level estimation using FFT.
//!
//! Produces the "average mic frequency" the meter displays: the mean energy of
//! the voice band, normalized to 0-100 against a reference level.

use rustfft::{num_complex::Complex, FftPlanner};

const FFT_SIZE: usize = 2048;
const VOICE_BAND_HZ: (f32, f32) = (100.0, 1500.0);
const BANDS: usize = 32;

/// Stateful analyzer with a reusable FFT planner.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    reference_level_db: i8,
}

impl SpectrumAnalyzer {
    pub fn new(reference_level_db: i8) -> Self {
        Self {
            planner: FftPlanner::new(),
            reference_level_db,
        }
    }

    /// Mean normalized energy (0-100) of the voice band in the latest window.
    pub fn average_level(&mut self, samples: &[i16], sample_rate: u32) -> f32 {
        let bands = voice_bands(
            samples,
            sample_rate,
            self.reference_level_db,
            &mut self.planner,
        );
        if bands.is_empty() {
            return 0.0;
        }
        bands.iter().sum::<f32>() / bands.len() as f32
    }
}

/// Splits the voice band of the most recent window into evenly spaced bands,
/// each normalized to 0-100.
///
/// Bands below the noise gate (35 dB under the reference) read as zero.
fn voice_bands(
    samples: &[i16],
    sample_rate: u32,
    reference_level_db: i8,
    planner: &mut FftPlanner<f32>,
) -> Vec<f32> {
    if samples.is_empty() || sample_rate == 0 {
        return vec![0.0; BANDS];
    }

    let window_len = samples.len().min(FFT_SIZE);
    let recent = &samples[samples.len() - window_len..];

    // Hanning window
    let mut buffer: Vec<Complex<f32>> = recent
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / window_len as f32).cos());
            Complex::new(s as f32 * w / 32768.0, 0.0)
        })
        .collect();
    buffer.resize(FFT_SIZE, Complex::new(0.0, 0.0));

    planner.plan_fft_forward(FFT_SIZE).process(&mut buffer);

    let resolution = sample_rate as f32 / FFT_SIZE as f32;
    let min_bin = (VOICE_BAND_HZ.0 / resolution) as usize;
    let max_bin = (VOICE_BAND_HZ.1 / resolution).min((FFT_SIZE / 2) as f32) as usize;
    if max_bin <= min_bin {
        return vec![0.0; BANDS];
    }

    let noise_gate_db = reference_level_db as f32 - 35.0;
    let db_range = reference_level_db as f32 - noise_gate_db;
    let span = max_bin - min_bin;

    (0..BANDS)
        .map(|band| {
            let start = min_bin + band * span / BANDS;
            let end = (min_bin + (band + 1) * span / BANDS).clamp(start + 1, max_bin.max(start + 1));
            let bins = &buffer[start..end.min(FFT_SIZE / 2)];
            if bins.is_empty() {
                return 0.0;
            }
            let magnitude = bins.iter().map(|c| c.norm()).sum::<f32>() / bins.len() as f32;
            let db = if magnitude > 1e-10 {
                20.0 * magnitude.log10()
            } else {
                -100.0
            };
            // FFT energy concentrates in few bins; align with RMS-style readings
            let adjusted = db - 20.0;
            if adjusted < noise_gate_db {
                0.0
            } else {
                ((adjusted - noise_gate_db) / db_range * 100.0).clamp(0.0, 100.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin() * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_silence_reads_zero() {
        let mut analyzer = SpectrumAnalyzer::new(-20);
        assert_eq!(analyzer.average_level(&[], 16000), 0.0);
        assert_eq!(analyzer.average_level(&vec![0; 4096], 16000), 0.0);
    }

    #[test]
    fn test_voice_tone_raises_level() {
        let mut analyzer = SpectrumAnalyzer::new(-20);
        let quiet = analyzer.average_level(&tone(440.0, 0.0002, 16000, 4096), 16000);
        let loud = analyzer.average_level(&tone(440.0, 0.8, 16000, 4096), 16000);
        assert!(loud > quiet, "loud={loud} quiet={quiet}");
        assert!((0.0..=100.0).contains(&loud));
    }

    #[test]
    fn test_short_buffers_are_padded() {
        let mut analyzer = SpectrumAnalyzer::new(-20);
        let level = analyzer.average_level(&tone(300.0, 0.5, 16000, 256), 16000);
        assert!((0.0..=100.0).contains(&level));
    }
}
