//! Streaming recognition session
//!
//! One cooperative task per connection. The session owns a sliding sample
//! window and a stateful resampler; incoming PCM is resampled to the
//! canonical rate and appended, progress ticks report the buffered
//! duration, and analysis attempts run off-task (CPU stages on the blocking
//! pool) with their result delivered back over a one-shot channel, so
//! ingestion never blocks on analysis. At most one attempt is in flight at
//! a time.
//!
//! Terminal messages (`match_found`, `no_match`, `error`) are always the
//! last message sent; a client `stop` tears the session down silently and
//! any in-flight attempt result is discarded.

use earmark_common::messages::ServerMessage;
use earmark_common::params::SessionParams;
use earmark_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::window::SampleWindow;
use super::{AttemptOutcome, RecognitionEngine};
use crate::audio::StreamResampler;

/// Inputs a transport feeds into a session.
#[derive(Debug)]
pub enum SessionInput {
    /// Opening configuration; must precede any PCM
    Config { sample_rate: u32 },
    /// One chunk of mono f32 PCM at the configured rate
    Pcm(Vec<f32>),
    /// Client-requested cancellation
    Stop,
}

type AttemptResult = std::result::Result<Result<AttemptOutcome>, tokio::time::error::Elapsed>;

/// Drive one recognition session to completion.
///
/// Returns when a terminal message has been sent, the client stopped, or
/// the transport went away. The outbound channel closing is treated as the
/// client disappearing.
pub async fn run_session(
    engine: Arc<RecognitionEngine>,
    params: SessionParams,
    mut inbound: mpsc::Receiver<SessionInput>,
    outbound: mpsc::Sender<ServerMessage>,
) {
    let session_id = Uuid::new_v4();
    debug!(%session_id, "session opened");

    // INIT: wait for configuration
    let idle = Duration::from_secs_f64(params.idle_timeout_secs);
    let sample_rate = match tokio::time::timeout(idle, inbound.recv()).await {
        Ok(Some(SessionInput::Config { sample_rate })) => sample_rate,
        Ok(Some(SessionInput::Stop)) | Ok(None) => {
            debug!(%session_id, "session closed before configuration");
            return;
        }
        Ok(Some(SessionInput::Pcm(_))) => {
            let _ = outbound
                .send(ServerMessage::Error {
                    message: "received PCM before configuration".into(),
                })
                .await;
            return;
        }
        Err(_) => {
            let _ = outbound
                .send(ServerMessage::Error {
                    message: "timed out waiting for configuration".into(),
                })
                .await;
            return;
        }
    };

    let canonical_rate = engine.analysis_params().sample_rate;
    let resampler = match StreamResampler::new(sample_rate, canonical_rate) {
        Ok(r) => r,
        Err(e) => {
            let _ = outbound
                .send(ServerMessage::Error { message: e.to_string() })
                .await;
            return;
        }
    };

    info!(%session_id, sample_rate, "session listening");

    let mut session = Session {
        session_id,
        engine,
        params,
        outbound,
        resampler,
        window: SampleWindow::new(canonical_rate, params.max_query_secs),
        last_attempt: None,
        in_flight: None,
        stopping: false,
    };

    let mut ticker = interval(Duration::from_secs_f64(params.tick_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut idle_deadline = Instant::now() + idle;

    loop {
        tokio::select! {
            maybe_input = inbound.recv() => {
                match maybe_input {
                    Some(SessionInput::Pcm(chunk)) => {
                        idle_deadline = Instant::now() + idle;
                        if !session.handle_chunk(&chunk).await {
                            return;
                        }
                    }
                    Some(SessionInput::Config { .. }) => {
                        warn!(%session_id, "duplicate configuration ignored");
                    }
                    Some(SessionInput::Stop) => {
                        debug!(%session_id, "client stop");
                        if session.in_flight.is_none() {
                            return;
                        }
                        // let the attempt finish silently, then exit
                        session.stopping = true;
                    }
                    None => {
                        debug!(%session_id, "transport closed");
                        return;
                    }
                }
            }

            _ = ticker.tick() => {
                if !session.stopping && !session.tick().await {
                    return;
                }
            }

            result = async { session.in_flight.as_mut().expect("guarded by is_some").await },
                if session.in_flight.is_some() =>
            {
                session.in_flight = None;
                if session.stopping {
                    debug!(%session_id, "discarding attempt result after stop");
                    return;
                }
                if !session.handle_attempt_result(result.ok()).await {
                    return;
                }
            }

            _ = sleep_until(idle_deadline) => {
                if !session.stopping {
                    let _ = session.outbound.send(ServerMessage::Error {
                        message: format!(
                            "no audio received for {:.0} seconds",
                            session.params.idle_timeout_secs
                        ),
                    }).await;
                }
                info!(%session_id, "session idle timeout");
                return;
            }
        }
    }
}

struct Session {
    session_id: Uuid,
    engine: Arc<RecognitionEngine>,
    params: SessionParams,
    outbound: mpsc::Sender<ServerMessage>,
    resampler: StreamResampler,
    window: SampleWindow,
    last_attempt: Option<Instant>,
    in_flight: Option<oneshot::Receiver<AttemptResult>>,
    stopping: bool,
}

impl Session {
    /// Resample and buffer one PCM chunk. Returns `false` when the session
    /// must end; [`Error::is_fatal_to_session`] decides whether a failure
    /// poisons the stream or merely drops the chunk.
    async fn handle_chunk(&mut self, chunk: &[f32]) -> bool {
        match self.resampler.process(chunk) {
            Ok(canonical) => {
                self.window.push(&canonical);
                self.maybe_start_attempt().await;
                true
            }
            Err(e) if e.is_fatal_to_session() => {
                warn!(session_id = %self.session_id, error = %e, "sample stream poisoned");
                let _ = self
                    .outbound
                    .send(ServerMessage::Error { message: e.to_string() })
                    .await;
                false
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "chunk dropped");
                true
            }
        }
    }

    /// Emit progress and re-check the attempt gate. Returns `false` when
    /// the client is gone.
    async fn tick(&mut self) -> bool {
        let progress = ServerMessage::Listening {
            duration: self.window.duration_secs(),
        };
        if self.outbound.send(progress).await.is_err() {
            return false;
        }
        self.maybe_start_attempt().await;
        true
    }

    /// Launch an analysis attempt when the gate allows one: enough audio,
    /// enough spacing since the last attempt, none already in flight.
    async fn maybe_start_attempt(&mut self) {
        if self.in_flight.is_some() || self.stopping {
            return;
        }
        if self.window.duration_secs() < self.params.min_query_secs {
            return;
        }
        if let Some(last) = self.last_attempt {
            if last.elapsed().as_secs_f64() < self.params.attempt_every_secs {
                return;
            }
        }

        self.last_attempt = Some(Instant::now());
        let snapshot = self.window.snapshot();
        let engine = Arc::clone(&self.engine);
        let budget = Duration::from_secs_f64(self.params.attempt_timeout_secs);
        let (tx, rx) = oneshot::channel();

        debug!(
            session_id = %self.session_id,
            buffered_secs = self.window.duration_secs(),
            "starting analysis attempt"
        );

        let _ = self.outbound.send(ServerMessage::Analyzing).await;

        tokio::spawn(async move {
            let result = tokio::time::timeout(budget, engine.analyze(snapshot)).await;
            let _ = tx.send(result);
        });
        self.in_flight = Some(rx);
    }

    /// Act on a finished attempt. Returns `false` when a terminal message
    /// went out (or the client is gone) and the session must end.
    async fn handle_attempt_result(&mut self, result: Option<AttemptResult>) -> bool {
        match result {
            Some(Ok(Ok(AttemptOutcome::Match { song, score }))) => {
                info!(
                    session_id = %self.session_id,
                    song_id = song.id,
                    confidence = score.confidence,
                    "match found"
                );
                let frame_duration = self.engine.analysis_params().frame_duration();
                let message = AttemptOutcome::Match { song, score }
                    .into_terminal_message(frame_duration);
                let _ = self.outbound.send(message).await;
                false
            }
            Some(Ok(Ok(AttemptOutcome::NoAlignment { empty_query }))) => {
                if self.window.is_full() {
                    // the window cannot grow further; give up
                    let message = AttemptOutcome::NoAlignment { empty_query }
                        .into_terminal_message(0.0);
                    info!(session_id = %self.session_id, "no match after full window");
                    let _ = self.outbound.send(message).await;
                    false
                } else {
                    debug!(session_id = %self.session_id, "attempt rejected, still listening");
                    true
                }
            }
            Some(Ok(Err(e))) => {
                // an attempt error degrades to a skipped attempt
                warn!(session_id = %self.session_id, error = %e, "analysis attempt failed");
                debug_assert!(!matches!(e, Error::EmptyFingerprint));
                true
            }
            Some(Err(_)) => {
                warn!(
                    session_id = %self.session_id,
                    budget_secs = self.params.attempt_timeout_secs,
                    "analysis attempt timed out"
                );
                true
            }
            None => {
                // worker dropped the channel without a result
                warn!(session_id = %self.session_id, "analysis attempt vanished");
                true
            }
        }
    }
}
