//! Named QA scenarios: a backend setup, scripted player sessions, and
//! expectations over what happened.
use anyhow::{Result, ensure};
use minddrift_game::{Answer, Ending, GameConfig, PredictionSource, SessionState};

use crate::backend::{CONTINUATION_BATCH, Endpoint, Fault, MemoryBackend};
use crate::driver::{SessionPlan, SessionSummary, Verdict};

pub type Expectation = fn(&[SessionSummary]) -> Result<()>;

#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    /// Sessions played back to back against the same backend.
    pub sessions: Vec<SessionPlan>,
    /// Faults injected into the in-memory backend. Scenarios with faults
    /// cannot run against a live backend.
    pub faults: Vec<(Endpoint, Fault)>,
    pub opening_count: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    fn new(name: &'static str, description: &'static str, plan: SessionPlan) -> Self {
        Self {
            name,
            description,
            sessions: vec![plan],
            faults: Vec::new(),
            opening_count: Some(5),
            request_timeout_ms: None,
            expectations: Vec::new(),
        }
    }

    fn with_fault(mut self, endpoint: Endpoint, fault: Fault) -> Self {
        self.faults.push((endpoint, fault));
        self
    }

    fn with_session(mut self, plan: SessionPlan) -> Self {
        self.sessions.push(plan);
        self
    }

    const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = Some(timeout_ms);
        self
    }

    fn check(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    #[must_use]
    pub fn needs_memory_backend(&self) -> bool {
        !self.faults.is_empty()
    }

    #[must_use]
    pub fn backend(&self) -> MemoryBackend {
        let mut backend = MemoryBackend::new().with_guesses(&["Bicycle", "Teapot", "Lamp"]);
        if let Some(count) = self.opening_count {
            backend = backend.with_opening_count(count);
        }
        for (endpoint, fault) in &self.faults {
            backend = backend.with_fault(*endpoint, *fault);
        }
        backend
    }

    #[must_use]
    pub fn config(&self, base: &GameConfig) -> GameConfig {
        let mut config = base.clone();
        if let Some(timeout) = self.request_timeout_ms {
            config.request_timeout_ms = timeout;
        }
        config
    }

    /// First failed expectation, if any.
    #[must_use]
    pub fn evaluate(&self, sessions: &[SessionSummary]) -> Option<String> {
        self.expectations
            .iter()
            .find_map(|expectation| expectation(sessions).err().map(|err| err.to_string()))
    }
}

fn only(sessions: &[SessionSummary]) -> Result<&SessionSummary> {
    sessions
        .first()
        .ok_or_else(|| anyhow::anyhow!("no session was played"))
}

fn guessed(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(
        session.final_state == SessionState::Ended,
        "session should end, finished in {}",
        session.final_state
    );
    ensure!(
        matches!(
            session.ending,
            Some(Ending::Guessed { questions, .. }) if questions == session.answers.len()
        ),
        "session should end with a confirmed guess counting every answer, got {:?}",
        session.ending
    );
    ensure!(
        session.report_acknowledged,
        "confirmed guess should be reported"
    );
    Ok(())
}

fn every_zone_answered(sessions: &[SessionSummary]) -> Result<()> {
    for session in sessions {
        ensure!(
            session.answers.len() == session.zones_total(),
            "{} answers recorded for {} zones",
            session.answers.len(),
            session.zones_total()
        );
    }
    Ok(())
}

fn all_yes(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(!session.answers.is_empty(), "no answers recorded");
    ensure!(
        session.answers.iter().all(|a| a.ends_with(": Yes")),
        "expected only Yes answers: {:?}",
        session.answers
    );
    Ok(())
}

fn answers_follow_lanes(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    let pattern = ["Yes", "Partial", "No"];
    for (index, answer) in session.answers.iter().enumerate() {
        let label = pattern[index % pattern.len()];
        ensure!(
            answer.ends_with(&format!(": {label}")),
            "answer {} should be {label}: {answer}",
            index + 1
        );
    }
    Ok(())
}

fn extended_once(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(
        session.zone_batches.len() == 2,
        "expected one follow-up batch, got {}",
        session.zone_batches.len() - 1
    );
    ensure!(
        session.zone_batches[1].len() == CONTINUATION_BATCH,
        "follow-up batch should hold {CONTINUATION_BATCH} questions"
    );
    let stop = session.guess_stops.first().copied().unwrap_or_default();
    ensure!(
        session.zone_batches[1][0] > stop,
        "follow-up zones must lie ahead of the car ({stop:.1})"
    );
    ensure!(
        session.guesses.len() == 2,
        "expected two guesses, got {}",
        session.guesses.len()
    );
    Ok(())
}

fn back_to_idle(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(
        session.final_state == SessionState::Idle,
        "session should fall back to idle, finished in {}",
        session.final_state
    );
    ensure!(session.answers.is_empty(), "no answers should be recorded");
    ensure!(
        !session.messages.is_empty(),
        "player should be told why the game did not start"
    );
    Ok(())
}

fn out_of_questions(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(
        session.ending
            == Some(Ending::OutOfQuestions {
                questions: session.answers.len()
            }),
        "expected to run out of questions, got {:?}",
        session.ending
    );
    Ok(())
}

fn failed(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(
        matches!(session.ending, Some(Ending::Failed { .. })),
        "expected a failed ending, got {:?}",
        session.ending
    );
    ensure!(
        !session.messages.is_empty(),
        "player should see an error message"
    );
    Ok(())
}

fn timed_out(sessions: &[SessionSummary]) -> Result<()> {
    let session = only(sessions)?;
    ensure!(session.timed_out, "request should time out");
    ensure!(
        session.guesses.is_empty(),
        "no guess should arrive after the timeout"
    );
    Ok(())
}

fn second_guess_from_cache(sessions: &[SessionSummary]) -> Result<()> {
    ensure!(sessions.len() == 2, "expected two sessions");
    let first = &sessions[0];
    let second = &sessions[1];
    ensure!(
        first.answers == second.answers,
        "both sessions should give the same answers"
    );
    let (Some(fresh), Some(repeat)) = (first.guesses.first(), second.guesses.first()) else {
        anyhow::bail!("both sessions should receive a guess");
    };
    ensure!(
        fresh.source == PredictionSource::Ai,
        "first guess should be fresh"
    );
    ensure!(
        repeat.source == PredictionSource::Cache && repeat.label == fresh.label,
        "second guess should be '{}' from cache, got '{}' ({:?})",
        fresh.label,
        repeat.label,
        repeat.source
    );
    Ok(())
}

fn mixed_plan() -> SessionPlan {
    SessionPlan::answering(&[Answer::Yes, Answer::Partial, Answer::No])
}

#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "smoke",
            "Answer every question Yes and accept the first guess",
            SessionPlan::answering(&[Answer::Yes]),
        )
        .check(guessed)
        .check(every_zone_answered)
        .check(all_yes),
        Scenario::new(
            "mixed-answers",
            "Rotate through the right, middle and left lanes",
            mixed_plan(),
        )
        .check(guessed)
        .check(answers_follow_lanes),
        Scenario::new(
            "continue-once",
            "Reject the first guess, drive the follow-up batch, accept the second",
            mixed_plan().with_verdicts(&[Verdict::Reject, Verdict::Accept]),
        )
        .check(guessed)
        .check(every_zone_answered)
        .check(extended_once),
        Scenario::new(
            "empty-start",
            "Backend returns no opening questions",
            mixed_plan(),
        )
        .with_fault(Endpoint::StartGame, Fault::Empty)
        .check(back_to_idle),
        Scenario::new(
            "empty-continuation",
            "Backend has no follow-up questions after a rejected guess",
            mixed_plan().with_verdicts(&[Verdict::Reject]),
        )
        .with_fault(Endpoint::ContinueGame, Fault::Empty)
        .check(out_of_questions),
        Scenario::new(
            "prediction-failure",
            "Backend errors while guessing",
            mixed_plan(),
        )
        .with_fault(Endpoint::Predict, Fault::Fail)
        .check(failed),
        Scenario::new(
            "hung-backend",
            "Backend never answers the guess request",
            mixed_plan(),
        )
        .with_fault(Endpoint::Predict, Fault::Hang)
        .with_timeout(200)
        .check(failed)
        .check(timed_out),
        Scenario::new(
            "cache-hit",
            "Replay a confirmed game and expect the cached guess",
            mixed_plan(),
        )
        .with_session(mixed_plan())
        .check(every_zone_answered)
        .check(second_guess_from_cache),
    ]
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog()
        .iter()
        .map(|scenario| (scenario.name, scenario.description))
        .collect()
}

#[must_use]
pub fn find_scenario(name: &str) -> Option<Scenario> {
    let wanted = name.trim().to_ascii_lowercase();
    catalog().into_iter().find(|scenario| scenario.name == wanted)
}
