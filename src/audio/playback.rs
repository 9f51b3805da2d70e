//! Scheduled playback of synthesized speech.
//!
//! `PlaybackScheduler` owns the timeline: a single monotonic cursor places
//! each decoded buffer back-to-back regardless of arrival jitter, so
//! ordering comes from the cursor and not from wall-clock arrival. The
//! scheduler is pure state driven by the session loop with an explicit
//! `now`, which keeps its ordering guarantees testable.
//!
//! `AudioSink` is the seam to the output device; the rodio implementation
//! queues buffers gaplessly on a dedicated thread (rodio output streams are
//! not Send) and can flush everything on a hard interrupt.

use std::collections::BTreeMap;
use std::thread::JoinHandle;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tracing::{info, warn};

use crate::error::SessionError;
use crate::session::InterruptPolicy;

/// A decoded buffer placed on the playback timeline. Owned by the scheduler
/// from `schedule` until its completion (or an interrupt) removes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackUnit {
    pub id: u64,
    /// Seconds on the session playback clock
    pub start: f64,
    pub duration: f64,
}

/// Timeline bookkeeping for gapless, strictly ordered playback.
#[derive(Debug)]
pub struct PlaybackScheduler {
    lead_in: f64,
    next_start: f64,
    next_id: u64,
    scheduled_total: u64,
    active: BTreeMap<u64, PlaybackUnit>,
}

impl PlaybackScheduler {
    /// `lead_in` is the guard interval (seconds) that keeps a unit from
    /// being scheduled in the past.
    pub fn new(lead_in: f64) -> Self {
        Self {
            lead_in,
            next_start: 0.0,
            next_id: 0,
            scheduled_total: 0,
            active: BTreeMap::new(),
        }
    }

    /// Place the next buffer on the timeline: never before `now + lead_in`,
    /// never before the end of the previously scheduled unit.
    pub fn schedule(&mut self, duration: f64, now: f64) -> PlaybackUnit {
        let start = self.next_start.max(now + self.lead_in);
        let id = self.next_id;
        self.next_id += 1;
        self.scheduled_total += 1;

        let unit = PlaybackUnit {
            id,
            start,
            duration,
        };
        self.active.insert(id, unit);
        self.next_start = start + duration;
        unit
    }

    /// Remove a finished unit. Returns true when this removal drained the
    /// active set. Ids already cleared by an interrupt or teardown are
    /// ignored.
    pub fn complete(&mut self, id: u64) -> bool {
        if self.active.remove(&id).is_none() {
            return false;
        }
        self.active.is_empty()
    }

    /// Apply an interruption signal. Under the hard policy every active
    /// unit is dropped and the cursor resets; under the soft policy
    /// already-scheduled units play to completion.
    pub fn interrupt(&mut self, policy: InterruptPolicy) -> Vec<PlaybackUnit> {
        match policy {
            InterruptPolicy::Hard => {
                self.next_start = 0.0;
                self.drain()
            }
            InterruptPolicy::Soft => Vec::new(),
        }
    }

    /// Unconditionally clear the timeline (teardown path), including units
    /// whose scheduled start is still in the future.
    pub fn clear(&mut self) -> Vec<PlaybackUnit> {
        self.next_start = 0.0;
        self.drain()
    }

    fn drain(&mut self) -> Vec<PlaybackUnit> {
        let units: Vec<PlaybackUnit> = self.active.values().copied().collect();
        self.active.clear();
        units
    }

    /// Reset the cursor after the post-drain grace delay, but only if the
    /// set is still empty and nothing new arrived since `snapshot` was
    /// taken. Keeps a future turn from inheriting stale scheduling drift.
    pub fn reset_if_idle(&mut self, snapshot: u64) -> bool {
        if self.active.is_empty() && self.scheduled_total == snapshot {
            self.next_start = 0.0;
            true
        } else {
            false
        }
    }

    pub fn cursor(&self) -> f64 {
        self.next_start
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Monotonic count of every unit ever scheduled; used to detect
    /// arrivals between a drain and its grace-delay check.
    pub fn scheduled_total(&self) -> u64 {
        self.scheduled_total
    }
}

/// Output device seam. The scheduler decides what plays and when; the sink
/// only queues buffers in the order it is handed them.
pub trait AudioSink: Send {
    /// Queue a decoded buffer behind whatever is already playing.
    fn enqueue(&self, samples: Vec<f32>, sample_rate: u32);

    /// Flush everything, including buffers not yet started.
    fn stop_all(&self);
}

enum SinkCommand {
    Enqueue(Vec<f32>, u32),
    StopAll,
    Shutdown,
}

/// Speaker output via rodio. Dropping the sink releases the output device.
pub struct RodioSink {
    commands: std::sync::mpsc::Sender<SinkCommand>,
    thread: Option<JoinHandle<()>>,
}

impl RodioSink {
    /// Open the default output device on a dedicated playback thread.
    pub fn spawn() -> std::result::Result<Self, SessionError> {
        let (commands, command_rx) = std::sync::mpsc::channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("voicelink-playback".into())
            .spawn(move || run_playback(command_rx, ready_tx))
            .map_err(|e| {
                SessionError::DeviceUnavailable(format!("Failed to spawn playback thread: {e}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                thread: Some(thread),
            }),
            Ok(Err(message)) => {
                let _ = thread.join();
                Err(SessionError::DeviceUnavailable(message))
            }
            Err(_) => {
                let _ = thread.join();
                Err(SessionError::DeviceUnavailable(
                    "Playback thread exited during setup".to_string(),
                ))
            }
        }
    }
}

impl AudioSink for RodioSink {
    fn enqueue(&self, samples: Vec<f32>, sample_rate: u32) {
        let _ = self.commands.send(SinkCommand::Enqueue(samples, sample_rate));
    }

    fn stop_all(&self) {
        let _ = self.commands.send(SinkCommand::StopAll);
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.commands.send(SinkCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Playback thread panicked during shutdown");
            }
        }
    }
}

fn run_playback(
    command_rx: std::sync::mpsc::Receiver<SinkCommand>,
    ready_tx: std::sync::mpsc::Sender<std::result::Result<(), String>>,
) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("Failed to open audio output: {e}")));
            return;
        }
    };
    let sink = match Sink::try_new(&stream_handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("Failed to create audio sink: {e}")));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));
    info!("Output device opened");

    while let Ok(command) = command_rx.recv() {
        match command {
            SinkCommand::Enqueue(samples, sample_rate) => {
                sink.append(SamplesBuffer::new(1, sample_rate, samples));
            }
            SinkCommand::StopAll => sink.stop(),
            SinkCommand::Shutdown => break,
        }
    }

    info!("Output device released");
}
