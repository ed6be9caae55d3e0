//! Drives one full session headlessly: a simulated car steers through the
//! zones while backend requests run as local tasks and come back over a
//! channel.
use anyhow::{Context, Result, bail};
use log::{debug, info};
use minddrift_game::{
    Answer, BackendGateway, BackendReply, CarPosition, DecisionZone, Delivery, Ending, GameConfig,
    GameSessionMachine, PendingRequest, Prediction, PredictionSource, PresentationPort,
    SessionState, SoundCue, Ticket, TickOutcome, dispatch,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::car::LaneCar;

/// What the simulated player does with a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
}

/// Scripted player behaviour for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// Answer for zone `i` is `answers[i % len]`; Partial when empty.
    pub answers: Vec<Answer>,
    /// Verdict for guess `i`; guesses past the end are accepted.
    pub verdicts: Vec<Verdict>,
}

impl SessionPlan {
    #[must_use]
    pub fn answering(answers: &[Answer]) -> Self {
        Self {
            answers: answers.to_vec(),
            verdicts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_verdicts(mut self, verdicts: &[Verdict]) -> Self {
        self.verdicts = verdicts.to_vec();
        self
    }

    #[must_use]
    pub fn answer_for(&self, zone_index: usize) -> Answer {
        if self.answers.is_empty() {
            Answer::Partial
        } else {
            self.answers[zone_index % self.answers.len()]
        }
    }

    fn verdict_for(&self, guess_index: usize) -> Verdict {
        self.verdicts
            .get(guess_index)
            .copied()
            .unwrap_or(Verdict::Accept)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DriveOptions {
    /// Simulated seconds per frame while playing.
    pub frame_dt: f64,
    /// Simulated driving time before the run is abandoned.
    pub max_drive_seconds: f64,
    /// Real time to wait for a reply before re-checking the request timeout.
    pub poll: Duration,
    /// Real time to wait for the fire-and-forget success report.
    pub report_wait: Duration,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            frame_dt: 1.0 / 60.0,
            max_drive_seconds: 900.0,
            poll: Duration::from_millis(5),
            report_wait: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuessRecord {
    pub label: String,
    pub source: PredictionSource,
}

/// Everything a scenario may want to check after one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub final_state: SessionState,
    pub ending: Option<Ending>,
    pub answers: Vec<String>,
    pub guesses: Vec<GuessRecord>,
    pub messages: Vec<String>,
    pub cues: Vec<SoundCue>,
    /// Zone positions, one entry per placed batch.
    pub zone_batches: Vec<Vec<f64>>,
    /// Car distance each time a guess came up.
    pub guess_stops: Vec<f64>,
    pub stale_replies: usize,
    pub timed_out: bool,
    pub report_acknowledged: bool,
    pub frames: u64,
}

impl SessionSummary {
    #[must_use]
    pub fn zones_total(&self) -> usize {
        self.zone_batches.iter().map(Vec::len).sum()
    }
}

/// Presentation port backed by the simulated car; records what a player
/// would have seen and heard.
#[derive(Debug, Default)]
struct TrackPort {
    car: CarPosition,
    guesses: Vec<GuessRecord>,
    messages: Vec<String>,
    cues: Vec<SoundCue>,
    zone_batches: Vec<Vec<f64>>,
}

impl PresentationPort for TrackPort {
    fn car_position(&self) -> CarPosition {
        self.car
    }

    fn on_progress(&mut self, resolved: usize, total: usize, current_question: Option<&str>) {
        debug!(
            "progress {resolved}/{total}: {}",
            current_question.unwrap_or("-")
        );
    }

    fn on_state_changed(&mut self, state: SessionState) {
        debug!("state -> {state}");
    }

    fn on_zones_added(&mut self, zones: &[DecisionZone]) {
        self.zone_batches
            .push(zones.iter().map(|zone| zone.position).collect());
    }

    fn on_prediction(&mut self, prediction: &Prediction) {
        self.guesses.push(GuessRecord {
            label: prediction.label.clone(),
            source: prediction.source,
        });
    }

    fn on_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn on_cue(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }
}

type Replies = (Ticket, BackendReply);

pub struct SessionDriver {
    gateway: Rc<dyn BackendGateway>,
    config: GameConfig,
    options: DriveOptions,
}

struct RunState {
    machine: GameSessionMachine<TrackPort>,
    car: LaneCar,
    guess_stops: Vec<f64>,
    stale_replies: usize,
    timed_out: bool,
    report_acknowledged: bool,
    frames: u64,
}

impl RunState {
    fn deliver(&mut self, (ticket, reply): Replies) -> Result<()> {
        match self.machine.deliver(ticket, reply)? {
            Delivery::Applied => {}
            Delivery::Stale => self.stale_replies += 1,
            Delivery::Acknowledged => self.report_acknowledged = true,
        }
        Ok(())
    }

    fn into_summary(self) -> SessionSummary {
        let machine = self.machine;
        let port = machine.port();
        SessionSummary {
            final_state: machine.state(),
            ending: machine.ending().cloned(),
            answers: machine.answers().to_vec(),
            guesses: port.guesses.clone(),
            messages: port.messages.clone(),
            cues: port.cues.clone(),
            zone_batches: port.zone_batches.clone(),
            guess_stops: self.guess_stops,
            stale_replies: self.stale_replies,
            timed_out: self.timed_out,
            report_acknowledged: self.report_acknowledged,
            frames: self.frames,
        }
    }
}

impl SessionDriver {
    #[must_use]
    pub fn new(gateway: Rc<dyn BackendGateway>, config: GameConfig, options: DriveOptions) -> Self {
        Self {
            gateway,
            config,
            options,
        }
    }

    /// Play one session to `Ended`, or until it falls back to `Idle`.
    ///
    /// Must run inside a `tokio::task::LocalSet`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the machine rejects
    /// an operation, or the drive exceeds its time budget.
    pub async fn run(&self, plan: &SessionPlan) -> Result<SessionSummary> {
        let machine = GameSessionMachine::new(self.config.clone(), TrackPort::default())
            .context("invalid game configuration")?;
        let (tx, mut rx) = unbounded_channel::<Replies>();
        let mut run = RunState {
            machine,
            car: LaneCar::new(),
            guess_stops: Vec::new(),
            stale_replies: 0,
            timed_out: false,
            report_acknowledged: false,
            frames: 0,
        };
        let mut guesses_judged = 0;
        let mut report_sent = false;
        let max_frames = frame_budget(self.options.max_drive_seconds, self.options.frame_dt);

        let opening = run.machine.start()?;
        self.send(&tx, opening);

        loop {
            while let Ok(reply) = rx.try_recv() {
                run.deliver(reply)?;
            }
            match run.machine.state() {
                SessionState::Idle | SessionState::Ended => break,
                state if state.is_waiting() => {
                    run.car.stop();
                    self.wait_for_reply(&mut run, &mut rx).await?;
                }
                SessionState::Playing => {
                    if run.frames >= max_frames {
                        bail!(
                            "drive exceeded {:.0}s with {} answers recorded",
                            self.options.max_drive_seconds,
                            run.machine.answers().len()
                        );
                    }
                    if let Some(request) = self.drive_frame(&mut run, plan)? {
                        self.send(&tx, request);
                    }
                    if run.frames % 120 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                SessionState::ResultShown => {
                    run.guess_stops.push(run.car.position().distance);
                    let verdict = plan.verdict_for(guesses_judged);
                    guesses_judged += 1;
                    info!("guess #{guesses_judged}: {verdict:?}");
                    let request = match verdict {
                        Verdict::Accept => {
                            report_sent = true;
                            run.machine.confirm_correct()?
                        }
                        Verdict::Reject => run.machine.confirm_incorrect()?,
                    };
                    self.send(&tx, request);
                }
                state => bail!("unexpected session state {state}"),
            }
        }

        if report_sent {
            self.await_report(&mut run, &mut rx).await?;
        }
        Ok(run.into_summary())
    }

    fn drive_frame(
        &self,
        run: &mut RunState,
        plan: &SessionPlan,
    ) -> Result<Option<PendingRequest>> {
        if !run.car.is_running() {
            debug!("car rolling at {:.1}", run.car.position().distance);
            run.car.start();
        }
        if run.machine.zones().next_pending().is_some() {
            let index = run.machine.zones().resolved_count();
            run.car.steer_for(plan.answer_for(index));
        }
        run.car.update(self.options.frame_dt);
        run.machine.port_mut().car = run.car.position();
        run.frames += 1;
        match run.machine.tick()? {
            TickOutcome::Finished { request, .. } => {
                run.car.stop();
                Ok(Some(request))
            }
            TickOutcome::Answered(answer) => {
                debug!("answered zone {}: {}", answer.index, answer.text);
                Ok(None)
            }
            TickOutcome::Driving | TickOutcome::Inactive => Ok(None),
        }
    }

    async fn wait_for_reply(
        &self,
        run: &mut RunState,
        rx: &mut UnboundedReceiver<Replies>,
    ) -> Result<()> {
        let started = Instant::now();
        match tokio::time::timeout(self.options.poll, rx.recv()).await {
            Ok(Some(reply)) => run.deliver(reply)?,
            Ok(None) => bail!("backend reply channel closed"),
            Err(_) => {}
        }
        if run.machine.advance_clock(started.elapsed()) {
            run.timed_out = true;
        }
        Ok(())
    }

    async fn await_report(
        &self,
        run: &mut RunState,
        rx: &mut UnboundedReceiver<Replies>,
    ) -> Result<()> {
        let deadline = Instant::now() + self.options.report_wait;
        while !run.report_acknowledged {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(reply)) => run.deliver(reply)?,
                Ok(None) | Err(_) => break,
            }
        }
        Ok(())
    }

    fn send(&self, tx: &UnboundedSender<Replies>, pending: PendingRequest) {
        let gateway = Rc::clone(&self.gateway);
        let tx = tx.clone();
        debug!("dispatching {} {}", pending.request.kind(), pending.ticket);
        tokio::task::spawn_local(async move {
            let reply = dispatch(gateway.as_ref(), &pending.request).await;
            // The receiver is gone once the session finished.
            let _ = tx.send((pending.ticket, reply));
        });
    }
}

fn frame_budget(seconds: f64, frame_dt: f64) -> u64 {
    if frame_dt <= 0.0 || !frame_dt.is_finite() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (seconds / frame_dt).ceil().max(0.0) as u64;
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Endpoint, Fault, MemoryBackend};
    use tokio::task::LocalSet;

    fn driver(backend: MemoryBackend, config: GameConfig) -> (Rc<MemoryBackend>, SessionDriver) {
        let backend = Rc::new(backend);
        let gateway: Rc<dyn BackendGateway> = backend.clone();
        (
            backend,
            SessionDriver::new(gateway, config, DriveOptions::default()),
        )
    }

    #[tokio::test]
    async fn drives_every_zone_with_the_planned_answers() {
        LocalSet::new()
            .run_until(async {
                let (backend, driver) =
                    driver(MemoryBackend::new().with_opening_count(4), GameConfig::default());
                let plan = SessionPlan::answering(&[Answer::Yes, Answer::No]);
                let summary = driver.run(&plan).await.unwrap();
                assert_eq!(summary.final_state, SessionState::Ended);
                assert_eq!(summary.answers.len(), 4);
                assert!(summary.answers[0].ends_with(": Yes"));
                assert!(summary.answers[1].ends_with(": No"));
                assert!(summary.report_acknowledged);
                assert_eq!(backend.cached_guesses(), 1);
                assert_eq!(summary.zones_total(), 4);
            })
            .await;
    }

    #[tokio::test]
    async fn rejected_guess_continues_past_the_stop() {
        LocalSet::new()
            .run_until(async {
                let (_, driver) =
                    driver(MemoryBackend::new().with_opening_count(2), GameConfig::default());
                let plan = SessionPlan::answering(&[Answer::Partial])
                    .with_verdicts(&[Verdict::Reject, Verdict::Accept]);
                let summary = driver.run(&plan).await.unwrap();
                assert_eq!(summary.answers.len(), 7);
                assert_eq!(summary.zone_batches.len(), 2);
                assert!(summary.zone_batches[1][0] > summary.guess_stops[0]);
                assert_eq!(
                    summary.ending,
                    Some(Ending::Guessed {
                        questions: 7,
                        label: "Bicycle".into()
                    })
                );
            })
            .await;
    }

    #[tokio::test]
    async fn hung_prediction_times_out() {
        LocalSet::new()
            .run_until(async {
                let config = GameConfig {
                    request_timeout_ms: 50,
                    ..GameConfig::default()
                };
                let (_, driver) = driver(
                    MemoryBackend::new()
                        .with_opening_count(1)
                        .with_fault(Endpoint::Predict, Fault::Hang),
                    config,
                );
                let summary = driver
                    .run(&SessionPlan::answering(&[Answer::Yes]))
                    .await
                    .unwrap();
                assert!(summary.timed_out);
                assert!(matches!(summary.ending, Some(Ending::Failed { .. })));
                assert!(!summary.report_acknowledged);
            })
            .await;
    }

    #[test]
    fn frame_budget_rounds_up() {
        assert_eq!(frame_budget(1.0, 0.5), 2);
        assert_eq!(frame_budget(1.0, 0.0), 0);
    }
}
