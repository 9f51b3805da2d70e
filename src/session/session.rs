use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{SessionConfig, CONTEXT_DELIMITER};
use super::stats::{SessionStats, TranscriptEntry};
use crate::audio::{
    decode_chunk, encode_frame, input_level, AudioFrame, AudioSink, CaptureBackend, CaptureDump,
    PlaybackScheduler,
};
use crate::error::SessionError;
use crate::knowledge::KnowledgeStore;
use crate::summary::SummaryService;
use crate::transcript::{Speaker, TranscriptAssembler, TurnUpdate};
use crate::transport::{ServerEvent, SessionDirectives, SessionTransport, TransportHandle};

/// Events surfaced to the embedding application.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A transcript line was created or grew; replace by turn id or append
    Transcript(TranscriptEntry),
    /// The agent started or finished speaking
    AgentSpeaking(bool),
    /// RMS level of the latest captured frame
    InputLevel(f32),
    /// A fresh transcript summary is available
    Summary(String),
}

/// Events buffered toward the embedding application. A slow (or absent)
/// consumer loses events rather than slowing the loop down.
const EVENT_QUEUE: usize = 256;
/// Playback completion signals buffered toward the loop.
const SIGNAL_QUEUE: usize = 64;

enum PlaybackSignal {
    /// A scheduled unit reached its end time
    Done(u64),
    /// Grace delay after a drain elapsed; reset the cursor if still idle
    IdleCheck { snapshot: u64 },
}

/// State shared between the session loop and the handle. Counters are only
/// written from the loop; the handle reads them for stats.
struct SessionShared {
    id: String,
    connected: AtomicBool,
    started_at: chrono::DateTime<Utc>,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    chunks_played: AtomicU64,
    chunks_skipped: AtomicU64,
    turns_completed: AtomicU64,
    active_units: AtomicU64,
    open_turns: AtomicU64,
    summarizing: AtomicBool,
    summarized_fingerprint: AtomicU64,
    transcript: Mutex<Vec<TranscriptEntry>>,
    summary: Mutex<String>,
}

/// A connected duplex session: microphone frames flow out, synthesized
/// speech and transcript deltas flow back in.
pub struct LiveSession {
    shared: Arc<SessionShared>,
    shutdown: watch::Sender<bool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    events: std::sync::Mutex<Option<mpsc::Receiver<SessionEvent>>>,
}

impl LiveSession {
    /// Open the capture device and the transport, then start the session
    /// loop.
    ///
    /// Fails atomically: when the transport cannot be opened, the
    /// already-acquired capture device is released before the error is
    /// returned.
    pub async fn connect(
        config: SessionConfig,
        mut capture: Box<dyn CaptureBackend>,
        sink: Box<dyn AudioSink>,
        transport: &dyn SessionTransport,
        knowledge: &dyn KnowledgeStore,
        summary: Arc<dyn SummaryService>,
    ) -> Result<Self, SessionError> {
        info!("Connecting session: {}", config.session_id);

        let context = knowledge.get().await;
        let system_instruction = if context.is_empty() {
            config.system_instruction.clone()
        } else {
            format!(
                "{}{}{}",
                config.system_instruction, CONTEXT_DELIMITER, context
            )
        };

        let directives = SessionDirectives {
            system_instruction,
            voice: config.voice.clone(),
            temperature: config.temperature,
            disable_thinking: true,
            input_sample_rate: config.input_sample_rate,
        };

        // Capture first; released again if the transport cannot be opened.
        let frame_rx = capture.start().await?;

        let transport_handle = match transport.open(&directives).await {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("Failed to release capture device after connect failure: {stop_err:#}");
                }
                return Err(e);
            }
        };

        let dump = config.capture_dump_path.as_ref().and_then(|path| {
            match CaptureDump::create(path, config.input_sample_rate) {
                Ok(dump) => Some(dump),
                Err(e) => {
                    warn!("Capture dump disabled: {e:#}");
                    None
                }
            }
        });

        let shared = Arc::new(SessionShared {
            id: config.session_id.clone(),
            connected: AtomicBool::new(true),
            started_at: Utc::now(),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            chunks_played: AtomicU64::new(0),
            chunks_skipped: AtomicU64::new(0),
            turns_completed: AtomicU64::new(0),
            active_units: AtomicU64::new(0),
            open_turns: AtomicU64::new(0),
            summarizing: AtomicBool::new(false),
            summarized_fingerprint: AtomicU64::new(0),
            transcript: Mutex::new(Vec::new()),
            summary: Mutex::new(String::new()),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);

        let loop_handle = tokio::spawn(run_session(
            config,
            Arc::clone(&shared),
            capture,
            sink,
            transport_handle,
            frame_rx,
            dump,
            summary,
            event_tx,
            shutdown_rx,
        ));

        info!("Session connected: {}", shared.id);

        Ok(Self {
            shared,
            shutdown: shutdown_tx,
            loop_handle: Mutex::new(Some(loop_handle)),
            events: std::sync::Mutex::new(Some(event_rx)),
        })
    }

    /// Tear the session down and wait for the loop to finish its teardown
    /// steps. Idempotent and safe from any state; teardown always runs to
    /// completion with every step best-effort.
    pub async fn disconnect(&self) {
        if self.shared.connected.swap(false, Ordering::SeqCst) {
            info!("Disconnecting session: {}", self.shared.id);
        }
        let _ = self.shutdown.send(true);

        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Session loop panicked: {e}");
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Take the event stream; available once per session.
    pub fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.shared.started_at);

        SessionStats {
            connected: self.shared.connected.load(Ordering::SeqCst),
            started_at: self.shared.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.shared.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.shared.frames_dropped.load(Ordering::Relaxed),
            chunks_played: self.shared.chunks_played.load(Ordering::Relaxed),
            chunks_skipped: self.shared.chunks_skipped.load(Ordering::Relaxed),
            turns_completed: self.shared.turns_completed.load(Ordering::Relaxed),
            active_units: self.shared.active_units.load(Ordering::Relaxed),
            open_turns: self.shared.open_turns.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of the live transcript view
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.shared.transcript.lock().await.clone()
    }

    /// Latest transcript summary; empty until the first successful poll
    pub async fn summary(&self) -> String {
        self.shared.summary.lock().await.clone()
    }
}

/// The single consumer of every event source in a session. All mutable
/// session state lives in here; nothing outside the loop touches it.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    config: SessionConfig,
    shared: Arc<SessionShared>,
    mut capture: Box<dyn CaptureBackend>,
    sink: Box<dyn AudioSink>,
    transport: TransportHandle,
    mut frame_rx: mpsc::Receiver<AudioFrame>,
    mut dump: Option<CaptureDump>,
    summary: Arc<dyn SummaryService>,
    event_tx: mpsc::Sender<SessionEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (transport, mut server_events) = transport.split();
    let mut scheduler = PlaybackScheduler::new(config.lead_in.as_secs_f64());
    let mut assembler = TranscriptAssembler::new();
    let playback_clock = Instant::now();
    let (signal_tx, mut signal_rx) = mpsc::channel::<PlaybackSignal>(SIGNAL_QUEUE);

    let mut summary_timer = tokio::time::interval(config.summary_interval);
    summary_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    summary_timer.reset();

    let mut capture_alive = true;
    let mut agent_speaking = false;

    loop {
        if !shared.connected.load(Ordering::SeqCst) {
            break;
        }

        tokio::select! {
            maybe_frame = frame_rx.recv(), if capture_alive => {
                match maybe_frame {
                    Some(frame) => {
                        let _ = event_tx.try_send(SessionEvent::InputLevel(input_level(&frame.samples)));

                        let mut dump_failed = false;
                        if let Some(writer) = dump.as_mut() {
                            if let Err(e) = writer.write_frame(&frame.samples) {
                                warn!("Capture dump failed, disabling: {e:#}");
                                dump_failed = true;
                            }
                        }
                        if dump_failed {
                            dump = None;
                        }

                        let payload = encode_frame(&frame.samples, frame.sample_rate);
                        if transport.send(payload) {
                            shared.frames_sent.fetch_add(1, Ordering::Relaxed);
                        } else {
                            shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    None => {
                        warn!("Capture stream ended");
                        capture_alive = false;
                    }
                }
            }

            maybe_event = server_events.recv() => {
                match maybe_event {
                    Some(ServerEvent::AudioChunk(bytes)) => {
                        match decode_chunk(&bytes) {
                            Ok(samples) if !samples.is_empty() => {
                                let duration = samples.len() as f64 / config.output_sample_rate as f64;
                                let now = playback_clock.elapsed().as_secs_f64();
                                let unit = scheduler.schedule(duration, now);
                                shared.active_units.store(scheduler.active_count() as u64, Ordering::Relaxed);
                                shared.chunks_played.fetch_add(1, Ordering::Relaxed);

                                sink.enqueue(samples, config.output_sample_rate);

                                if !agent_speaking {
                                    agent_speaking = true;
                                    let _ = event_tx.try_send(SessionEvent::AgentSpeaking(true));
                                }

                                let delay = (unit.start + unit.duration - now).max(0.0);
                                let tx = signal_tx.clone();
                                tokio::spawn(async move {
                                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                                    let _ = tx.send(PlaybackSignal::Done(unit.id)).await;
                                });
                            }
                            Ok(_) => {}
                            Err(e) => {
                                debug!("Skipping malformed audio chunk: {e}");
                                shared.chunks_skipped.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Some(ServerEvent::InputTranscriptDelta(text)) => {
                        if let Some(update) = assembler.apply_delta(Speaker::Source, &text) {
                            shared.open_turns.store(assembler.open_turns() as u64, Ordering::Relaxed);
                            record_update(&shared, &event_tx, update).await;
                        }
                    }
                    Some(ServerEvent::OutputTranscriptDelta(text)) => {
                        if let Some(update) = assembler.apply_delta(Speaker::Agent, &text) {
                            shared.open_turns.store(assembler.open_turns() as u64, Ordering::Relaxed);
                            record_update(&shared, &event_tx, update).await;
                        }
                    }
                    Some(ServerEvent::TurnComplete) => {
                        if assembler.open_turns() > 0 {
                            shared.turns_completed.fetch_add(1, Ordering::Relaxed);
                        }
                        assembler.complete_turn();
                        shared.open_turns.store(0, Ordering::Relaxed);
                    }
                    Some(ServerEvent::Interrupted) => {
                        let cleared = scheduler.interrupt(config.interrupt_policy);
                        shared.active_units.store(scheduler.active_count() as u64, Ordering::Relaxed);
                        if !cleared.is_empty() {
                            debug!("Interrupted: dropped {} scheduled units", cleared.len());
                            sink.stop_all();
                        }
                        if scheduler.active_count() == 0 && agent_speaking {
                            agent_speaking = false;
                            let _ = event_tx.try_send(SessionEvent::AgentSpeaking(false));
                        }
                    }
                    None => {
                        info!("Transport closed by the remote end");
                        break;
                    }
                }
            }

            Some(signal) = signal_rx.recv() => {
                match signal {
                    PlaybackSignal::Done(id) => {
                        let drained = scheduler.complete(id);
                        shared.active_units.store(scheduler.active_count() as u64, Ordering::Relaxed);
                        if drained {
                            if agent_speaking {
                                agent_speaking = false;
                                let _ = event_tx.try_send(SessionEvent::AgentSpeaking(false));
                            }
                            let snapshot = scheduler.scheduled_total();
                            let tx = signal_tx.clone();
                            let grace = config.grace;
                            tokio::spawn(async move {
                                tokio::time::sleep(grace).await;
                                let _ = tx.send(PlaybackSignal::IdleCheck { snapshot }).await;
                            });
                        }
                    }
                    PlaybackSignal::IdleCheck { snapshot } => {
                        if scheduler.reset_if_idle(snapshot) {
                            debug!("Playback cursor reset");
                        }
                    }
                }
            }

            _ = summary_timer.tick() => {
                poll_summary(&config, &shared, &summary, &event_tx).await;
            }

            _ = shutdown.changed() => break,
        }
    }

    // Teardown runs the same way no matter how the loop ended. Every step
    // is best-effort; nothing here may escape.
    shared.connected.store(false, Ordering::SeqCst);

    // 1. Stop capture first so no frame is sent after teardown begins.
    if let Err(e) = capture.stop().await {
        warn!("Failed to stop capture: {e:#}");
    }

    // 2. Stop and clear scheduled playback, including units whose start
    //    time is still in the future.
    let cleared = scheduler.clear();
    if !cleared.is_empty() {
        debug!("Dropped {} scheduled playback units", cleared.len());
    }
    sink.stop_all();
    shared.active_units.store(0, Ordering::Relaxed);

    // 3. Close the transport; anything it delivers after this is ignored.
    transport.close();

    // 4. Release the playback device.
    drop(sink);

    assembler.complete_turn();
    shared.open_turns.store(0, Ordering::Relaxed);

    if let Some(dump) = dump.take() {
        if let Err(e) = dump.finish() {
            warn!("Failed to finalize capture dump: {e:#}");
        }
    }

    if agent_speaking {
        let _ = event_tx.try_send(SessionEvent::AgentSpeaking(false));
    }

    info!("Session disconnected: {}", shared.id);
}

/// Upsert one turn update into the transcript view and forward it.
async fn record_update(
    shared: &SessionShared,
    event_tx: &mpsc::Sender<SessionEvent>,
    update: TurnUpdate,
) {
    let entry = TranscriptEntry {
        turn_id: update.turn_id,
        speaker: update.speaker,
        text: update.text,
        timestamp: update.started_at,
    };

    {
        let mut transcript = shared.transcript.lock().await;
        match transcript.iter_mut().find(|e| e.turn_id == entry.turn_id) {
            Some(existing) => existing.text = entry.text.clone(),
            None => transcript.push(entry.clone()),
        }
    }

    let _ = event_tx.try_send(SessionEvent::Transcript(entry));
}

/// Ask the summarizer for a fresh summary when the transcript is long
/// enough and has grown since the last summarized snapshot. The call runs
/// off-loop so a slow summarizer never stalls the audio path.
async fn poll_summary(
    config: &SessionConfig,
    shared: &Arc<SessionShared>,
    summary: &Arc<dyn SummaryService>,
    event_tx: &mpsc::Sender<SessionEvent>,
) {
    let snapshot: Vec<(Speaker, String)> = {
        let transcript = shared.transcript.lock().await;
        transcript
            .iter()
            .map(|entry| (entry.speaker, entry.text.clone()))
            .collect()
    };

    if snapshot.len() < config.summary_min_entries {
        return;
    }

    // Turn text only ever grows, so entry count plus total length is a
    // change detector that cannot collide.
    let fingerprint =
        snapshot.len() as u64 + snapshot.iter().map(|(_, text)| text.len() as u64).sum::<u64>();
    if fingerprint == shared.summarized_fingerprint.load(Ordering::Relaxed) {
        return;
    }

    if shared.summarizing.swap(true, Ordering::SeqCst) {
        return;
    }

    let summary = Arc::clone(summary);
    let shared = Arc::clone(shared);
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        let text = summary.summarize(&snapshot).await;
        if !text.is_empty() && shared.connected.load(Ordering::SeqCst) {
            shared
                .summarized_fingerprint
                .store(fingerprint, Ordering::Relaxed);
            *shared.summary.lock().await = text.clone();
            let _ = event_tx.try_send(SessionEvent::Summary(text));
        }
        shared.summarizing.store(false, Ordering::SeqCst);
    });
}
