//! The gameplay session state machine.
//!
//! `GameSessionMachine` owns the questions, the zone layout, the recorded
//! answers, and the current [`SessionState`]. It is driven from a single
//! thread: the render loop calls [`GameSessionMachine::tick`] and
//! [`GameSessionMachine::advance_clock`] every frame, UI handlers call the
//! user operations, and backend replies come back through
//! [`GameSessionMachine::deliver`]. Each backend call is a [`PendingRequest`]
//! with a [`Ticket`]; only the single outstanding ticket is accepted, so a
//! late or duplicated reply can never move the machine.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::answer::{Answer, format_answer};
use crate::backend::{
    BackendReply, BackendRequest, GatewayError, PendingRequest, Prediction, Question, QuestionId,
    RequestKind, Ticket,
};
use crate::config::{ConfigError, GameConfig};
use crate::constants::{
    MSG_EMPTY_BATCH, MSG_LOAD_FAILED, MSG_NO_MORE_QUESTIONS, MSG_PREDICTION_FAILED, MSG_TIMED_OUT,
};
use crate::presentation::{PresentationPort, SoundCue};
use crate::resolver::SpatialAnswerResolver;
use crate::zones::{ZoneError, ZoneRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Loading,
    Playing,
    Predicting,
    ResultShown,
    Extending,
    Ended,
}

impl SessionState {
    /// States parked on a backend reply.
    #[must_use]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::Loading | Self::Predicting | Self::Extending)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Predicting => "predicting",
            Self::ResultShown => "result_shown",
            Self::Extending => "extending",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// How a session reached `Ended`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Ending {
    /// The player confirmed the guess.
    Guessed { questions: usize, label: String },
    /// No follow-up questions were available after a rejected guess.
    OutOfQuestions { questions: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("cannot {operation} while the session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
    #[error("reply for ticket {ticket} does not match the pending {expected} request")]
    ReplyMismatch { ticket: Ticket, expected: RequestKind },
    #[error(transparent)]
    Zone(#[from] ZoneError),
}

/// An answer recorded on this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAnswer {
    /// Zero-based position in the answer list.
    pub index: usize,
    pub question_id: QuestionId,
    pub answer: Answer,
    /// Formatted `"<question>: <label>"` string sent to the backend.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Zone checking is off in the current state.
    Inactive,
    /// Playing, but no zone was reached.
    Driving,
    Answered(RecordedAnswer),
    /// The last zone was answered and a prediction was requested.
    Finished {
        answer: RecordedAnswer,
        request: PendingRequest,
    },
}

/// What [`GameSessionMachine::deliver`] did with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The reply drove a transition.
    Applied,
    /// The ticket is not outstanding; the reply was dropped.
    Stale,
    /// A fire-and-forget success report came back.
    Acknowledged,
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    ticket: Ticket,
    kind: RequestKind,
    waited: Duration,
}

pub struct GameSessionMachine<P: PresentationPort> {
    config: GameConfig,
    resolver: SpatialAnswerResolver,
    port: P,
    state: SessionState,
    zones: ZoneRegistry,
    answers: Vec<String>,
    prediction: Option<Prediction>,
    ending: Option<Ending>,
    last_error: Option<String>,
    pending: Option<Outstanding>,
    report: Option<Ticket>,
    next_ticket: Ticket,
    last_distance: f64,
}

impl<P: PresentationPort> GameSessionMachine<P> {
    /// Build an idle machine.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: GameConfig, port: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            resolver: config.resolver(),
            config,
            port,
            state: SessionState::Idle,
            zones: ZoneRegistry::new(),
            answers: Vec::new(),
            prediction: None,
            ending: None,
            last_error: None,
            pending: None,
            report: None,
            next_ticket: Ticket::new(1),
            last_distance: 0.0,
        })
    }

    // Queries ---------------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Recorded answers, in resolution order.
    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub const fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.zones.zones().iter().map(|zone| &zone.question)
    }

    /// Question the car is driving towards.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.zones.next_pending().map(|zone| &zone.question)
    }

    #[must_use]
    pub const fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    #[must_use]
    pub const fn ending(&self) -> Option<&Ending> {
        self.ending.as_ref()
    }

    /// Last user-visible error, cleared when a new session starts.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.pending.map(|pending| pending.ticket)
    }

    #[must_use]
    pub const fn port(&self) -> &P {
        &self.port
    }

    pub const fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    // User operations -------------------------------------------------------

    /// Begin a new session and request the opening question batch.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the machine is idle.
    pub fn start(&mut self) -> Result<PendingRequest, SessionError> {
        self.expect_state("start", &[SessionState::Idle])?;
        self.clear_session();
        self.port.on_cue(SoundCue::Click);
        self.enter(SessionState::Loading);
        Ok(self.issue(BackendRequest::InitialQuestions))
    }

    /// Poll the car position and resolve at most one zone.
    ///
    /// # Errors
    ///
    /// Returns an error only if the prediction request could not be issued,
    /// which the state check in this method rules out.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.state != SessionState::Playing {
            return Ok(TickOutcome::Inactive);
        }
        let position = self.port.car_position();
        self.last_distance = position.distance;
        let Some(zone) = self
            .zones
            .check_and_resolve(position.distance, self.config.proximity_radius)
        else {
            return Ok(TickOutcome::Driving);
        };

        let answer = self.resolver.resolve(position.lateral);
        let text = format_answer(&zone.question.text, self.config.labels.label(answer));
        debug!(
            "zone {} at {:.1} answered {answer} (lateral {:.2}): {text}",
            zone.index, zone.position, position.lateral
        );
        self.answers.push(text.clone());
        debug_assert_eq!(self.answers.len(), self.zones.resolved_count());
        self.port.on_cue(SoundCue::Answer);

        let recorded = RecordedAnswer {
            index: zone.index,
            question_id: zone.question.id,
            answer,
            text,
        };

        if self.zones.all_resolved() {
            self.report_progress();
            let request = self.request_prediction()?;
            Ok(TickOutcome::Finished {
                answer: recorded,
                request,
            })
        } else {
            self.report_progress();
            Ok(TickOutcome::Answered(recorded))
        }
    }

    /// Leave `Playing` and ask the backend for a guess.
    ///
    /// Runs automatically from [`Self::tick`] when the last zone resolves.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the machine is
    /// playing with every zone resolved.
    pub fn request_prediction(&mut self) -> Result<PendingRequest, SessionError> {
        if self.state != SessionState::Playing || self.zones.is_empty() || !self.zones.all_resolved()
        {
            return Err(SessionError::InvalidTransition {
                operation: "request a prediction",
                state: self.state,
            });
        }
        self.enter(SessionState::Predicting);
        self.port.on_cue(SoundCue::Thinking);
        Ok(self.issue(BackendRequest::Prediction {
            answers: self.answers.clone(),
        }))
    }

    /// The player accepts the guess. The session ends immediately; the
    /// returned success report is fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless a guess is shown.
    pub fn confirm_correct(&mut self) -> Result<PendingRequest, SessionError> {
        self.expect_state("confirm the guess", &[SessionState::ResultShown])?;
        let Some(prediction) = self.prediction.clone() else {
            return Err(SessionError::InvalidTransition {
                operation: "confirm the guess",
                state: self.state,
            });
        };
        info!(
            "guess '{}' confirmed after {} questions",
            prediction.label,
            self.answers.len()
        );
        self.ending = Some(Ending::Guessed {
            questions: self.answers.len(),
            label: prediction.label.clone(),
        });
        self.port.on_cue(SoundCue::Win);
        self.enter(SessionState::Ended);

        let ticket = self.take_ticket();
        self.report = Some(ticket);
        Ok(PendingRequest {
            ticket,
            request: BackendRequest::ReportSuccess {
                answers: self.answers.clone(),
                prediction,
            },
        })
    }

    /// The player rejects the guess; request more questions.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless a guess is shown.
    pub fn confirm_incorrect(&mut self) -> Result<PendingRequest, SessionError> {
        self.expect_state("reject the guess", &[SessionState::ResultShown])?;
        self.port.on_cue(SoundCue::Click);
        self.enter(SessionState::Extending);
        self.port.on_cue(SoundCue::Thinking);
        Ok(self.issue(BackendRequest::Continuation {
            answers: self.answers.clone(),
        }))
    }

    /// Return to `Idle` after a session ended. A no-op when already idle.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] from any other state.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Ended => {
                self.clear_session();
                self.enter(SessionState::Idle);
                Ok(())
            }
            state => Err(SessionError::InvalidTransition {
                operation: "reset",
                state,
            }),
        }
    }

    // Backend plumbing ------------------------------------------------------

    /// Feed back the reply for a previously issued request.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ReplyMismatch`] if the reply variant does not
    /// fit the outstanding request, and [`SessionError::Zone`] if the
    /// received batch could not be laid out.
    pub fn deliver(&mut self, ticket: Ticket, reply: BackendReply) -> Result<Delivery, SessionError> {
        if let BackendReply::Reported(result) = reply {
            return Ok(self.acknowledge_report(ticket, result));
        }
        let Some(outstanding) = self.pending.filter(|pending| pending.ticket == ticket) else {
            warn!("dropping stale backend reply for ticket {ticket}");
            return Ok(Delivery::Stale);
        };

        match (outstanding.kind, reply) {
            (RequestKind::InitialQuestions, BackendReply::Questions(result)) => {
                self.pending = None;
                self.apply_initial_batch(result)?;
            }
            (RequestKind::Prediction, BackendReply::Prediction(result)) => {
                self.pending = None;
                self.apply_prediction(result);
            }
            (RequestKind::Continuation, BackendReply::Questions(result)) => {
                self.pending = None;
                self.apply_continuation(result)?;
            }
            (expected, _) => {
                return Err(SessionError::ReplyMismatch { ticket, expected });
            }
        }
        Ok(Delivery::Applied)
    }

    /// Account for wall-clock time spent waiting on the outstanding request.
    ///
    /// Returns `true` if the request timed out on this call; the machine has
    /// then left its waiting state and any later reply is stale.
    pub fn advance_clock(&mut self, elapsed: Duration) -> bool {
        let Some(outstanding) = self.pending.as_mut() else {
            return false;
        };
        outstanding.waited = outstanding.waited.saturating_add(elapsed);
        if outstanding.waited < self.config.request_timeout() {
            return false;
        }
        let kind = outstanding.kind;
        let ticket = outstanding.ticket;
        self.pending = None;
        warn!("{kind} request {ticket} timed out while {}", self.state);
        match kind {
            RequestKind::InitialQuestions => self.fail_to_idle(MSG_TIMED_OUT),
            RequestKind::Prediction | RequestKind::Continuation => self.finish(
                Ending::Failed {
                    reason: MSG_TIMED_OUT.to_string(),
                },
                Some(MSG_TIMED_OUT),
            ),
            RequestKind::ReportSuccess => {}
        }
        true
    }

    // Internals -------------------------------------------------------------

    fn apply_initial_batch(
        &mut self,
        result: Result<Vec<Question>, GatewayError>,
    ) -> Result<(), SessionError> {
        let questions = match result {
            Ok(questions) if questions.is_empty() => {
                warn!("initial batch was empty");
                self.fail_to_idle(MSG_EMPTY_BATCH);
                return Ok(());
            }
            Ok(questions) => questions,
            Err(err) => {
                error!("initial batch failed: {err}");
                self.fail_to_idle(MSG_LOAD_FAILED);
                return Ok(());
            }
        };

        let placed = self.zones.extend(
            questions,
            self.config.first_question_distance,
            self.config.question_spacing,
        );
        debug_assert!(placed.is_ok(), "initial zone layout failed: {placed:?}");
        // Release builds fall through to the error branch below.
        let range = match placed {
            Ok(range) => range,
            Err(err) => {
                self.fail_to_idle(MSG_LOAD_FAILED);
                return Err(err.into());
            }
        };
        info!("placed {} zones", range.len());
        self.port.on_zones_added(&self.zones.zones()[range]);
        self.enter(SessionState::Playing);
        self.report_progress();
        Ok(())
    }

    fn apply_prediction(&mut self, result: Result<Prediction, GatewayError>) {
        match result {
            Ok(prediction) => {
                info!(
                    "guess '{}' received ({:?})",
                    prediction.label, prediction.source
                );
                self.port.on_prediction(&prediction);
                self.prediction = Some(prediction);
                self.enter(SessionState::ResultShown);
            }
            Err(err) => {
                error!("prediction failed: {err}");
                self.finish(
                    Ending::Failed {
                        reason: err.to_string(),
                    },
                    Some(MSG_PREDICTION_FAILED),
                );
            }
        }
    }

    fn apply_continuation(
        &mut self,
        result: Result<Vec<Question>, GatewayError>,
    ) -> Result<(), SessionError> {
        let questions = match result {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => {
                info!("no follow-up questions after {} answers", self.answers.len());
                self.finish_out_of_questions();
                return Ok(());
            }
            Err(err) => {
                error!("continuation batch failed: {err}");
                self.finish(
                    Ending::Failed {
                        reason: err.to_string(),
                    },
                    Some(MSG_LOAD_FAILED),
                );
                return Ok(());
            }
        };

        // The car keeps rolling while the follow-up batch loads.
        let car = self.port.car_position().distance.max(self.last_distance);
        let start = car + self.config.first_question_distance;
        let placed = self
            .zones
            .extend(questions, start, self.config.question_spacing);
        debug_assert!(placed.is_ok(), "continuation zone layout failed: {placed:?}");
        // Release builds fall through to the error branch below.
        let range = match placed {
            Ok(range) => range,
            Err(err) => {
                self.finish_out_of_questions();
                return Err(err.into());
            }
        };
        info!("extended track by {} zones", range.len());
        self.port.on_zones_added(&self.zones.zones()[range]);
        self.enter(SessionState::Playing);
        self.report_progress();
        Ok(())
    }

    fn acknowledge_report(&mut self, ticket: Ticket, result: Result<(), GatewayError>) -> Delivery {
        if self.report != Some(ticket) {
            warn!("dropping stale success report for ticket {ticket}");
            return Delivery::Stale;
        }
        self.report = None;
        match result {
            Ok(()) => info!("confirmed guess saved"),
            Err(err) => warn!("could not save confirmed guess: {err}"),
        }
        Delivery::Acknowledged
    }

    fn finish_out_of_questions(&mut self) {
        self.finish(
            Ending::OutOfQuestions {
                questions: self.answers.len(),
            },
            Some(MSG_NO_MORE_QUESTIONS),
        );
    }

    fn finish(&mut self, ending: Ending, message: Option<&str>) {
        self.ending = Some(ending);
        if let Some(message) = message {
            self.last_error = Some(message.to_string());
            self.port.on_message(message);
        }
        self.enter(SessionState::Ended);
    }

    fn fail_to_idle(&mut self, message: &str) {
        self.zones.clear();
        self.answers.clear();
        self.last_error = Some(message.to_string());
        self.port.on_message(message);
        self.enter(SessionState::Idle);
    }

    fn report_progress(&mut self) {
        let resolved = self.zones.resolved_count();
        let total = self.zones.len();
        let current = self.zones.next_pending().map(|zone| zone.question.text.as_str());
        self.port.on_progress(resolved, total, current);
    }

    fn clear_session(&mut self) {
        self.zones.clear();
        self.answers.clear();
        self.prediction = None;
        self.ending = None;
        self.last_error = None;
        self.pending = None;
        self.last_distance = 0.0;
    }

    fn enter(&mut self, next: SessionState) {
        info!("session {} -> {next}", self.state);
        self.state = next;
        self.port.on_state_changed(next);
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    fn take_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        ticket
    }

    fn issue(&mut self, request: BackendRequest) -> PendingRequest {
        let ticket = self.take_ticket();
        debug!("issuing {} request {ticket}", request.kind());
        self.pending = Some(Outstanding {
            ticket,
            kind: request.kind(),
            waited: Duration::ZERO,
        });
        PendingRequest { ticket, request }
    }
}

impl<P: PresentationPort + fmt::Debug> fmt::Debug for GameSessionMachine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSessionMachine")
            .field("state", &self.state)
            .field("zones", &self.zones.len())
            .field("answers", &self.answers.len())
            .field("pending", &self.pending_ticket())
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
