use crate::answer::Answer;
use crate::constants::ANSWER_THRESHOLD;

/// Maps the car's lateral offset at a decision zone to an answer.
///
/// Positive offsets are to the right of the road centre. The policy is
/// symmetric around zero and total: every input, including NaN, maps to an
/// answer (NaN fails both comparisons and lands on `Partial`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialAnswerResolver {
    threshold: f64,
}

impl SpatialAnswerResolver {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn resolve(&self, lateral_offset: f64) -> Answer {
        if lateral_offset > self.threshold {
            Answer::Yes
        } else if lateral_offset < -self.threshold {
            Answer::No
        } else {
            Answer::Partial
        }
    }
}

impl Default for SpatialAnswerResolver {
    fn default() -> Self {
        Self::new(ANSWER_THRESHOLD)
    }
}
