//! Microphone capture engine backed by cpal.
//!
//! Audio is captured from the configured input device, mixed down to mono
//! i16 PCM, and written to a WAV file when the recording is finished.

use super::engine::{AudioJob, AudioSrc, CaptureEngine, EngineEvent, FilePayload};
use super::error::RecorderError;
use super::spectrum::SpectrumAnalyzer;
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Samples kept for one level reading.
const LEVEL_WINDOW: usize = 2048;

/// Capture engine driving a cpal input stream.
///
/// Features:
/// - Captures from a named, indexed or default input device at its native rate
/// - Mixes multi-channel input down to mono
/// - Pause and resume without losing samples
/// - Voice-band level readings for the meter
pub struct CpalEngine {
    /// Device name, index, or "default"
    device_name: String,
    /// Actual sample rate, updated from the device on start
    sample_rate: u32,
    /// Recorded mono samples
    samples: Arc<Mutex<Vec<i16>>>,
    /// Live input stream; holding it keeps the device acquired
    stream: Option<cpal::Stream>,
    is_paused: Arc<Mutex<bool>>,
    analyzer: SpectrumAnalyzer,
    events: UnboundedSender<EngineEvent>,
    /// Directory that receives the encoded WAV files
    output_dir: PathBuf,
    /// Finished recordings so far; numbers each output file
    attempt: u32,
}

impl CpalEngine {
    /// Creates an engine that has not yet touched the device.
    ///
    /// # Arguments
    /// * `device_name` - "default", a device name, or an index from `arec list-devices`
    /// * `requested_sample_rate` - Preferred rate; the device's native rate wins
    /// * `reference_level_db` - dBFS level shown as a full meter
    /// * `events` - Where lifecycle events are sent
    pub fn new(
        device_name: String,
        requested_sample_rate: u32,
        reference_level_db: i8,
        events: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            device_name,
            sample_rate: requested_sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            is_paused: Arc::new(Mutex::new(false)),
            analyzer: SpectrumAnalyzer::new(reference_level_db),
            events,
            output_dir: std::env::temp_dir(),
            attempt: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        lock(&self.samples).len()
    }

    /// Path for the next encoded recording; unique per call.
    fn next_output_path(&mut self) -> PathBuf {
        self.attempt += 1;
        self.output_dir
            .join(format!("arec_{}_{}.wav", std::process::id(), self.attempt))
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Engine event receiver dropped");
        }
    }

    /// Opens the device and starts a fresh capture.
    fn acquire(&mut self) -> Result<()> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let channels = device_config.channels() as usize;

        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }
        self.sample_rate = device_sample_rate;

        lock(&self.samples).clear();
        *lock(&self.is_paused) = false;

        let samples = Arc::clone(&self.samples);
        let paused = Arc::clone(&self.is_paused);
        let error_callback = |err| tracing::error!("Audio stream error: {}", err);

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !*lock(&paused) {
                        mix_to_mono(data, &mut lock(&samples), channels);
                    }
                },
                error_callback,
                None,
            )?,
            cpal::SampleFormat::F32 => device.build_input_stream(
                &device_config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !*lock(&paused) {
                        let converted: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        mix_to_mono(&converted, &mut lock(&samples), channels);
                    }
                },
                error_callback,
                None,
            )?,
            other => return Err(anyhow!("Unsupported sample format: {other:?}")),
        };

        stream.play()?;
        self.stream = Some(stream);

        tracing::debug!(
            "Audio stream started: {}Hz, {} channels",
            device_sample_rate,
            channels
        );
        Ok(())
    }
}

impl CaptureEngine for CpalEngine {
    fn supported(&self) -> bool {
        suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            let count = host
                .input_devices()
                .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
                .count();
            Ok(count > 0)
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Capture support check failed: {}", e);
            false
        })
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| RecorderError::DeviceBlocked(e.to_string()))?;
            *lock(&self.is_paused) = false;
            tracing::debug!("Recording resumed");
            return Ok(());
        }

        match self.acquire() {
            Ok(()) => {
                self.emit(EngineEvent::Recording);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to start recording: {}", e);
                Err(RecorderError::DeviceBlocked(e.to_string()))
            }
        }
    }

    fn pause(&mut self) {
        *lock(&self.is_paused) = true;
        tracing::debug!("Recording paused");
    }

    fn stop(&mut self) {
        *lock(&self.is_paused) = true;
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::debug!("Failed to pause stream on stop: {}", e);
            }
        }
        let sample_count = self.sample_count();
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            sample_count as f32 / self.sample_rate.max(1) as f32,
            sample_count,
            self.sample_rate
        );
    }

    fn average_mic_frequency(&mut self) -> f32 {
        if self.stream.is_none() || *lock(&self.is_paused) {
            return 0.0;
        }
        let window: Vec<i16> = {
            let samples = lock(&self.samples);
            let start = samples.len().saturating_sub(LEVEL_WINDOW);
            samples[start..].to_vec()
        };
        self.analyzer.average_level(&window, self.sample_rate)
    }

    fn wav_url(&mut self) -> AudioJob {
        let samples = lock(&self.samples).clone();
        let sample_rate = self.sample_rate;
        let path = self.next_output_path();
        let events = self.events.clone();

        Box::pin(async move {
            if samples.is_empty() {
                tracing::warn!("Recording stopped with no samples captured");
                return Err(RecorderError::EncodingFailure(
                    "no audio was captured".to_string(),
                ));
            }

            let target = path.clone();
            tokio::task::spawn_blocking(move || write_wav(&samples, sample_rate, &target))
                .await
                .map_err(|e| RecorderError::EncodingFailure(e.to_string()))?
                .map_err(|e| RecorderError::EncodingFailure(e.to_string()))?;

            let _ = events.send(EngineEvent::FileReady(FilePayload::wav(path.clone())));
            Ok(AudioSrc::from_path(&path))
        })
    }

    fn release_mic(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Microphone released");
        }
    }
}

/// Locks a mutex, recovering the data if a capture callback panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Appends interleaved input to `samples` as mono by averaging channels.
fn mix_to_mono(data: &[i16], samples: &mut Vec<i16>, channels: usize) {
    match channels {
        0 | 1 => samples.extend_from_slice(data),
        n => samples.extend(data.chunks_exact(n).map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / n as i32) as i16
        })),
    }
}

/// Writes mono 16-bit PCM samples to a WAV file.
fn write_wav(samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    tracing::debug!("WAV written: {} ({} samples)", path.display(), samples.len());
    Ok(())
}

/// Finds an audio input device by name or numeric index.
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    if let Ok(index) = device_spec.parse::<usize>() {
        let mut devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();
        let count = devices.len();
        if index < count {
            return Ok(devices.swap_remove(index));
        }
        return Err(anyhow!(
            "Device index {} is out of range (0-{})",
            index,
            count.saturating_sub(1)
        ));
    }

    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;
    for device in devices {
        if device.name().is_ok_and(|name| name == device_spec) {
            return Ok(device);
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'arec list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// No ALSA outside Linux, nothing to suppress.
#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono() {
        let mut samples = Vec::new();
        mix_to_mono(&[100, 200, -100, -300], &mut samples, 2);
        assert_eq!(samples, vec![150, -200]);

        let mut samples = Vec::new();
        mix_to_mono(&[1, 2, 3], &mut samples, 1);
        assert_eq!(samples, vec![1, 2, 3]);

        let mut samples = Vec::new();
        mix_to_mono(&[3, 3, 3, 6, 6, 6, 9], &mut samples, 3);
        assert_eq!(samples, vec![3, 6]);
    }

    #[test]
    fn test_write_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        write_wav(&[0, 1000, -1000, i16::MAX], 16000, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0, 1000, -1000, i16::MAX]);
    }

    #[tokio::test]
    async fn test_wav_url_without_samples_fails() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = CpalEngine::new("default".into(), 16000, -20, tx);
        let result = engine.wav_url().await;
        assert!(matches!(result, Err(RecorderError::EncodingFailure(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wav_url_writes_file_and_reports_it() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CpalEngine::new("default".into(), 16000, -20, tx);
        engine.output_dir = dir.path().to_path_buf();
        engine.samples.lock().unwrap().extend_from_slice(&[1, 2, 3, 4]);

        let expected = dir
            .path()
            .join(format!("arec_{}_1.wav", std::process::id()));
        let src = engine.wav_url().await.unwrap();
        assert!(src.as_str().starts_with("file:///"));
        assert_eq!(src, AudioSrc::from_path(&expected));
        assert!(expected.exists());
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::FileReady(FilePayload::wav(expected))
        );
    }

    #[tokio::test]
    async fn test_each_wav_url_gets_its_own_file() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CpalEngine::new("default".into(), 16000, -20, tx);
        engine.output_dir = dir.path().to_path_buf();
        engine.samples.lock().unwrap().extend_from_slice(&[1, 2, 3, 4]);

        // Both jobs are created before either runs, as with a retry mid-encode
        let first = engine.wav_url();
        engine.samples.lock().unwrap().clear();
        engine.samples.lock().unwrap().extend_from_slice(&[9, 9]);
        let second = engine.wav_url();

        let second_src = second.await.unwrap();
        let first_src = first.await.unwrap();
        assert_ne!(first_src, second_src);

        let paths: Vec<PathBuf> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                EngineEvent::FileReady(payload) => Some(payload.path),
                _ => None,
            })
            .collect();
        assert_eq!(paths.len(), 2);

        let second_samples: Vec<i16> = hound::WavReader::open(&paths[0])
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(second_samples, vec![9, 9]);
        let first_samples: Vec<i16> = hound::WavReader::open(&paths[1])
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(first_samples, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_level_is_zero_without_stream() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = CpalEngine::new("default".into(), 16000, -20, tx);
        engine.samples.lock().unwrap().extend(std::iter::repeat(8000).take(4096));
        assert_eq!(engine.average_mic_frequency(), 0.0);
    }
}
