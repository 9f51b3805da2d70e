//! Microphone capture.
//!
//! The `CaptureBackend` trait is the seam the session uses; the cpal
//! implementation opens the default input device at its native rate,
//! downmixes to mono, resamples to the configured rate, and pushes
//! fixed-size frames into a bounded channel. The capture callback never
//! blocks: when the channel is full the frame is dropped.

use anyhow::Result;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::SessionError;

/// Frames buffered between the capture thread and the session loop.
const FRAME_QUEUE: usize = 32;

/// One fixed-size frame of captured audio (normalized mono samples).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Rate frames are delivered at (the device is resampled if needed)
    pub sample_rate: u32,
    /// Samples per frame (256 at 16kHz is ~16ms)
    pub frame_samples: usize,
}

/// Audio capture backend.
///
/// A backend is startable once per session: `start` acquires the hardware
/// device and `stop` releases it. Restarting mid-session is not supported.
#[async_trait]
pub trait CaptureBackend: Send {
    /// Acquire the input device and start producing frames.
    ///
    /// Fails with `SessionError::DeviceUnavailable` when no device is
    /// present or access is denied; this is terminal for the connect
    /// attempt.
    async fn start(&mut self) -> std::result::Result<mpsc::Receiver<AudioFrame>, SessionError>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the backend currently holds the device.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Microphone capture via cpal.
pub struct CpalBackend {
    config: CaptureConfig,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CpalBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        }
    }
}

#[async_trait]
impl CaptureBackend for CpalBackend {
    async fn start(&mut self) -> std::result::Result<mpsc::Receiver<AudioFrame>, SessionError> {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let config = self.config.clone();
        let capturing = Arc::clone(&self.capturing);

        // cpal streams are not Send; the stream lives on a dedicated thread
        // and is dropped there, which releases the device.
        let thread = std::thread::Builder::new()
            .name("voicelink-capture".into())
            .spawn(move || run_capture(config, frame_tx, ready_tx, stop_rx, capturing))
            .map_err(|e| {
                SessionError::DeviceUnavailable(format!("Failed to spawn capture thread: {e}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                let _ = thread.join();
                return Err(SessionError::DeviceUnavailable(message));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(SessionError::DeviceUnavailable(
                    "Capture thread exited during setup".to_string(),
                ));
            }
        }

        self.capturing.store(true, Ordering::SeqCst);
        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

fn run_capture(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: std::sync::mpsc::Sender<std::result::Result<(), String>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
    capturing: Arc<AtomicBool>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err("No default input device available".to_string()));
            return;
        }
    };
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let default_config = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("Failed to read input config: {e}")));
            return;
        }
    };

    let native_rate = default_config.sample_rate().0;
    let channels = default_config.channels();
    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(native_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        device = %device_name,
        native_rate,
        channels,
        target_rate = config.sample_rate,
        "Opening input device"
    );

    let target_rate = config.sample_rate;
    let frame_samples = config.frame_samples;
    let started = Instant::now();
    let mut pending: Vec<f32> = Vec::with_capacity(frame_samples * 2);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _info: &cpal::InputCallbackInfo| {
            let mono = if channels > 1 {
                to_mono(data, channels)
            } else {
                data.to_vec()
            };
            let resampled = if native_rate != target_rate {
                resample_linear(&mono, native_rate, target_rate)
            } else {
                mono
            };

            pending.extend_from_slice(&resampled);
            while pending.len() >= frame_samples {
                let samples: Vec<f32> = pending.drain(..frame_samples).collect();
                let frame = AudioFrame {
                    samples,
                    sample_rate: target_rate,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };
                // Queue full means the session loop is behind; drop the
                // frame rather than block the device callback.
                let _ = frame_tx.try_send(frame);
            }
        },
        |err| {
            warn!("Input stream error: {err}");
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("Failed to build input stream: {e}")));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("Failed to start input stream: {e}")));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until stop is signalled or the backend is dropped.
    let _ = stop_rx.recv();

    capturing.store(false, Ordering::SeqCst);
    drop(stream);
    info!(device = %device_name, "Input device released");
}

/// Down-mix interleaved multi-channel audio to mono by averaging channels.
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear resampler from `from_rate` to `to_rate`, mono f32.
fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let frac = (src_idx - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }
    output
}
