use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use super::events::{EventEmitter, TestEvent};
use super::recorder::{Outcome, ResultRecorder, RunLog};
use super::state::{RunSummary, SessionState};
use super::steps::{Fixture, Group, Pace, Step};
use crate::http::{ExecutorError, RequestExecutor, Transport};
use crate::utils::config::Config;

/// Delays inserted between steps that sent a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub inter_step_delay: Duration,
    /// Used after steps hitting heavy endpoints
    pub extended_delay: Duration,
}

impl PacingPolicy {
    pub fn none() -> Self {
        Self {
            inter_step_delay: Duration::ZERO,
            extended_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            inter_step_delay: config.step_delay(),
            extended_delay: config.slow_step_delay(),
        }
    }

    pub fn delay_after(&self, step: &Step) -> Duration {
        match step.pace {
            Pace::Normal => self.inter_step_delay,
            Pace::Extended => self.extended_delay,
        }
    }
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub log: RunLog,
    pub summary: RunSummary,
    /// Session as the last executed step left it
    pub session: SessionState,
}

impl RunOutcome {
    /// A run that ended before its first step, logged as a single `ERROR` entry.
    pub fn failed_to_start(started_at: DateTime<Local>, base_url: &str, error: &str) -> Self {
        let mut recorder = ResultRecorder::new(started_at);
        record_abort(&mut recorder, error);
        let log = recorder.into_log();
        let summary = RunSummary::from_log(&log, 0, true, 0);
        Self {
            log,
            summary,
            session: SessionState::new(base_url),
        }
    }

    pub fn aborted(&self) -> bool {
        self.summary.aborted
    }
}

fn record_abort(recorder: &mut ResultRecorder, error: &str) {
    recorder.record(
        "ERROR",
        "ERROR",
        None,
        Some(Outcome::Error(error.to_string())),
        false,
        Some("Error during test execution".to_string()),
    );
}

enum StepOutcome {
    Attempted(SessionState),
    Skipped(SessionState),
}

/// A failure no step can turn into a record; ends the run.
struct Aborted {
    error: ExecutorError,
    session: SessionState,
}

/// Runs steps in order through a single combinator, [`Orchestrator::run_step`].
pub struct Orchestrator<T: Transport> {
    executor: RequestExecutor<T>,
    recorder: ResultRecorder,
    pacing: PacingPolicy,
    emitter: EventEmitter,
    fixture: Fixture,
    base_url: String,
    skipped: usize,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(
        executor: RequestExecutor<T>,
        pacing: PacingPolicy,
        fixture: Fixture,
        base_url: &str,
        started_at: DateTime<Local>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            executor,
            recorder: ResultRecorder::new(started_at),
            pacing,
            emitter,
            fixture,
            base_url: base_url.to_string(),
            skipped: 0,
        }
    }

    /// Run every step. Individual outcomes never stop the sequence; only a
    /// configuration error does, and it is recorded as an `ERROR` entry.
    pub async fn run(mut self, steps: &[Step]) -> RunOutcome {
        let started = Instant::now();
        self.emitter.emit(TestEvent::RunStarted {
            base_url: self.base_url.clone(),
            step_count: steps.len(),
        });

        let session = SessionState::new(&self.base_url);
        let (session, aborted) = match self.run_sequence(steps, session).await {
            Ok(session) => (session, false),
            Err(Aborted { error, session }) => {
                log::error!("run aborted: {}", error);
                record_abort(&mut self.recorder, &error.to_string());
                self.emitter.emit(TestEvent::RunAborted {
                    error: error.to_string(),
                });
                (session, true)
            }
        };

        let log = self.recorder.into_log();
        let summary = RunSummary::from_log(
            &log,
            self.skipped,
            aborted,
            started.elapsed().as_millis() as u64,
        );
        self.emitter.emit(TestEvent::RunFinished {
            summary: summary.clone(),
        });

        RunOutcome {
            log,
            summary,
            session,
        }
    }

    async fn run_sequence(
        &mut self,
        steps: &[Step],
        mut session: SessionState,
    ) -> Result<SessionState, Aborted> {
        let mut group: Option<Group> = None;

        for (i, step) in steps.iter().enumerate() {
            if group != Some(step.group) {
                group = Some(step.group);
                self.emitter.emit(TestEvent::GroupStarted {
                    title: step.group.title().to_string(),
                });
            }

            session = match self.run_step(i + 1, step, session).await? {
                StepOutcome::Skipped(session) => session,
                StepOutcome::Attempted(session) => {
                    let delay = self.pacing.delay_after(step);
                    if i + 1 < steps.len() && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    session
                }
            };
        }

        Ok(session)
    }

    /// Gate, send, record and hand back the session for the next step.
    async fn run_step(
        &mut self,
        index: usize,
        step: &Step,
        session: SessionState,
    ) -> Result<StepOutcome, Aborted> {
        let endpoint = match step.endpoint(&session) {
            Some(endpoint) => endpoint,
            None => {
                self.skipped += 1;
                self.emitter.emit(TestEvent::StepSkipped {
                    index,
                    description: step.description.to_string(),
                    reason: step.precondition().reason().to_string(),
                });
                return Ok(StepOutcome::Skipped(session));
            }
        };

        let payload = step.build_payload(&self.fixture);
        let request = step.build_request(&endpoint, &session, payload.clone());

        self.emitter.emit(TestEvent::StepStarted {
            index,
            description: step.description.to_string(),
            method: step.method.to_string(),
            endpoint: endpoint.clone(),
        });

        let started = Instant::now();
        let result = self.executor.execute(&request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(res) => {
                let success = res.is_success();
                let notes = (res.attempts > 1)
                    .then(|| format!("Response received after {} attempts", res.attempts));
                self.recorder.record(
                    &endpoint,
                    step.method,
                    payload,
                    Some(Outcome::Response(&res)),
                    success,
                    notes,
                );

                if !success {
                    let mut message =
                        format!("{} failed with status {}", step.description, res.status);
                    // session-feeding steps show what the server said
                    if !step.captures.is_empty() && !res.body.trim().is_empty() {
                        message = format!("{}: {}", message, res.body.trim());
                    }
                    self.emitter.emit(TestEvent::StepFailed {
                        index,
                        message,
                        duration_ms,
                    });
                    return Ok(StepOutcome::Attempted(session));
                }

                let body = res.json();
                let session = match &body {
                    Some(body) => step.capture(session, body),
                    None => session,
                };
                let count = body.as_ref().and_then(|b| step.count(b));
                let message = match (count, step.captured_id(&session)) {
                    (Some(count), _) => format!("{} ({} found)", step.description, count),
                    (None, Some(id)) => format!("{} (ID: {})", step.description, id),
                    (None, None) => step.description.to_string(),
                };
                self.emitter.emit(TestEvent::StepPassed {
                    index,
                    message,
                    status: res.status,
                    duration_ms,
                });
                Ok(StepOutcome::Attempted(session))
            }

            Err(error) if error.is_configuration() => Err(Aborted { error, session }),

            Err(error) => {
                let message = error.to_string();
                let notes = if error.was_sent() {
                    "No response from server"
                } else {
                    "Request could not be built"
                };
                self.recorder.record(
                    &endpoint,
                    step.method,
                    payload,
                    Some(Outcome::Error(message.clone())),
                    false,
                    Some(notes.to_string()),
                );
                self.emitter.emit(TestEvent::StepFailed {
                    index,
                    message: format!("{}: {}", step.description, message),
                    duration_ms,
                });
                Ok(StepOutcome::Attempted(session))
            }
        }
    }
}
