//! MindDrift Game Engine
//!
//! Platform-agnostic session logic for MindDrift, a twenty-questions game
//! played by steering a car through Yes / Partial / No gates. This crate owns
//! the gameplay state machine and leaves rendering, audio, and HTTP transport
//! to the host through the [`PresentationPort`] and [`BackendGateway`] traits.

pub mod answer;
pub mod backend;
pub mod config;
pub mod constants;
pub mod presentation;
pub mod resolver;
pub mod session;
pub mod wire;
pub mod zones;

// Re-export commonly used types
pub use answer::{Answer, AnswerLabels, format_answer};
pub use backend::{
    BackendGateway, BackendReply, BackendRequest, GatewayError, PendingRequest, Prediction,
    PredictionArtifact, PredictionSource, Question, QuestionId, RequestKind, Ticket, dispatch,
};
pub use config::{ConfigError, GameConfig};
pub use presentation::{CarPosition, PresentationPort, SoundCue};
pub use resolver::SpatialAnswerResolver;
pub use session::{
    Delivery, Ending, GameSessionMachine, RecordedAnswer, SessionError, SessionState, TickOutcome,
};
pub use zones::{DecisionZone, ResolvedZone, ZoneError, ZoneRegistry};

/// Key under which a confirmed guess is cached for a given answer list.
#[must_use]
pub fn answers_key(answers: &[String]) -> String {
    answers.join(constants::ANSWER_KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_key_joins_with_pipe() {
        let answers = vec!["Alive?: Yes".to_string(), "Red?: No".to_string()];
        assert_eq!(answers_key(&answers), "Alive?: Yes|Red?: No");
        assert_eq!(answers_key(&[]), "");
    }
}
