//! The debounced, cancellable suggestion loop.
//!
//! The engine is a state machine (`Idle → Debouncing → Pending → Fulfilled |
//! Cancelled | Failed → Idle`) driven by one tokio task per surface. Every
//! fetch carries a monotonically increasing generation; a completion whose
//! generation does not match the current one is discarded unconditionally,
//! which is what makes cancellation race-free.

use super::thread::build_continuation_prompt;
use super::{SuggestionConfig, SuggestionState, SurfaceEvent, SurfaceSink, has_signoff};
use crate::error::Result;
use crate::generator::{EmailGenerator, GenerationContext, ThreadContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct FetchOutcome {
    generation: u64,
    result: Result<String>,
}

pub struct SuggestionEngine<S: SurfaceSink> {
    generator: Arc<EmailGenerator>,
    sink: S,
    config: SuggestionConfig,
    thread: Option<ThreadContext>,

    events: mpsc::Receiver<SurfaceEvent>,
    results_tx: mpsc::Sender<FetchOutcome>,
    results_rx: mpsc::Receiver<FetchOutcome>,
    state_tx: watch::Sender<SuggestionState>,

    deadline: Option<Instant>,
    pending_block: String,
    generation: u64,
    in_flight: Option<CancellationToken>,
    suggestion: Option<String>,
}

impl<S: SurfaceSink> SuggestionEngine<S> {
    /// Returns the engine plus the event sender the surface feeds and a
    /// watch handle over the suggestion cell (for diagnostics and tests).
    pub fn new(
        generator: Arc<EmailGenerator>,
        sink: S,
        thread: Option<ThreadContext>,
        config: SuggestionConfig,
    ) -> (
        Self,
        mpsc::Sender<SurfaceEvent>,
        watch::Receiver<SuggestionState>,
    ) {
        let (events_tx, events_rx) = mpsc::channel(32);
        let (results_tx, results_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(SuggestionState::default());

        let engine = Self {
            generator,
            sink,
            config,
            thread,
            events: events_rx,
            results_tx,
            results_rx,
            state_tx,
            deadline: None,
            pending_block: String::new(),
            generation: 0,
            in_flight: None,
            suggestion: None,
        };
        (engine, events_tx, state_rx)
    }

    /// Drive the surface until teardown (explicit event or channel close).
    /// Debounce timers die with this task; an in-flight fetch is cancelled
    /// on the way out.
    pub async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            let debounce = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = self.events.recv() => match event {
                    Some(SurfaceEvent::Edited(snapshot)) => self.on_edit(snapshot),
                    Some(SurfaceEvent::Accept) => self.on_accept(),
                    Some(SurfaceEvent::Teardown) | None => break,
                },
                () = debounce, if self.deadline.is_some() => self.begin_fetch(),
                outcome = self.results_rx.recv() => {
                    if let Some(outcome) = outcome {
                        self.on_fetch_complete(outcome);
                    }
                }
            }
        }

        self.cancel_in_flight();
    }

    fn on_edit(&mut self, snapshot: super::EditSnapshot) {
        // Any edit invalidates a rendered suggestion.
        if self.suggestion.take().is_some() {
            self.sink.clear_suggestion();
        }

        let qualifies = snapshot.cursor_at_block_end
            && !snapshot.block_text.is_empty()
            && !has_signoff(&snapshot.block_text);

        // A superseding edit always cancels an in-flight fetch; a qualifying
        // one re-arms the debounce window from this (the last) edit, so a
        // burst collapses to one fetch and never two run concurrently.
        self.cancel_in_flight();
        if qualifies {
            self.pending_block = snapshot.block_text;
            self.deadline = Some(Instant::now() + Duration::from_millis(self.config.debounce_ms));
        } else {
            self.pending_block.clear();
            self.deadline = None;
        }
        self.publish_state();
    }

    fn on_accept(&mut self) {
        // No pending suggestion: no-op, the surface falls through to the
        // default key behavior.
        if let Some(text) = self.suggestion.take() {
            self.sink.insert_text(&text);
            self.sink.clear_suggestion();
            self.publish_state();
        }
    }

    fn begin_fetch(&mut self) {
        self.deadline = None;
        if self.pending_block.is_empty() {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        let prompt = build_continuation_prompt(self.thread.as_ref(), &self.pending_block);
        let context = GenerationContext {
            current_content: Some(self.pending_block.clone()),
            cancel: Some(token),
            ..GenerationContext::default()
        };
        let generator = Arc::clone(&self.generator);
        let results_tx = self.results_tx.clone();

        tokio::spawn(async move {
            let result = generator.generate(&prompt, &context).await.map(|responses| {
                responses
                    .into_iter()
                    .next()
                    .map(|response| response.content)
                    .unwrap_or_default()
            });
            let _ = results_tx.send(FetchOutcome { generation, result }).await;
        });
        self.publish_state();
    }

    fn on_fetch_complete(&mut self, outcome: FetchOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!(
                stale = outcome.generation,
                current = self.generation,
                "discarding stale suggestion fetch"
            );
            return;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(text) if !text.is_empty() => {
                self.sink.show_suggestion(&text);
                self.suggestion = Some(text);
            }
            Ok(_) => {}
            Err(error) if error.is_cancelled() => {
                tracing::debug!("suggestion fetch cancelled");
            }
            Err(error) => {
                // Diagnostics only; never rendered on the surface.
                tracing::warn!(%error, "suggestion fetch failed");
                self.sink.clear_suggestion();
            }
        }
        self.publish_state();
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
            // Bump so a completion from the cancelled fetch can never match.
            self.generation += 1;
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(SuggestionState {
            pending_text: self.suggestion.clone(),
            is_loading: self.in_flight.is_some(),
        });
    }
}
