//! Decision zones laid out along the track.
//!
//! Positions are distances along the track, growing in the direction of
//! travel. Zones are stored in question order and, because positions are
//! strictly increasing, the resolved zones always form a prefix of the list.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

use crate::backend::Question;

/// Trigger region for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionZone {
    pub position: f64,
    pub question: Question,
    pub resolved: bool,
}

/// A zone that resolved on the current call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedZone {
    /// Index of the zone in question order.
    pub index: usize,
    pub position: f64,
    pub question: Question,
}

/// Precondition violations when laying out zones.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ZoneError {
    #[error("zone position {position:.2} must be beyond the last zone at {last:.2}")]
    NonMonotonic { position: f64, last: f64 },
    #[error("zone position must be finite (got {position})")]
    NonFinite { position: f64 },
    #[error("zone spacing must be positive and finite (got {spacing})")]
    InvalidSpacing { spacing: f64 },
}

/// Ordered collection of decision zones for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneRegistry {
    zones: Vec<DecisionZone>,
    resolved: usize,
    last_trigger: Option<f64>,
}

impl ZoneRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            zones: Vec::new(),
            resolved: 0,
            last_trigger: None,
        }
    }

    /// Append an unresolved zone beyond every existing zone.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError`] if `position` is not finite or does not lie
    /// strictly beyond the last zone.
    pub fn add_zone(&mut self, question: Question, position: f64) -> Result<(), ZoneError> {
        if !position.is_finite() {
            return Err(ZoneError::NonFinite { position });
        }
        if let Some(last) = self.last_position()
            && position <= last
        {
            return Err(ZoneError::NonMonotonic { position, last });
        }
        self.zones.push(DecisionZone {
            position,
            question,
            resolved: false,
        });
        Ok(())
    }

    /// Append a contiguous run of zones `spacing` apart.
    ///
    /// The first new zone sits one `spacing` past the current last zone, or
    /// at `start_position` if that lies further ahead (or if the registry is
    /// empty). Returns the index range of the added zones.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError`] if `spacing` or `start_position` is unusable.
    pub fn extend(
        &mut self,
        questions: impl IntoIterator<Item = Question>,
        start_position: f64,
        spacing: f64,
    ) -> Result<Range<usize>, ZoneError> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(ZoneError::InvalidSpacing { spacing });
        }
        let first = self.len();
        let mut position = match self.last_position() {
            Some(last) => (last + spacing).max(start_position),
            None => start_position,
        };
        for question in questions {
            self.add_zone(question, position)?;
            position += spacing;
        }
        Ok(first..self.len())
    }

    /// Resolve the next pending zone if the car has reached it.
    ///
    /// Only the earliest unresolved zone is eligible, so zones resolve in the
    /// order they were added. It resolves when `current_position` is within
    /// `proximity_radius` of it, or when the car is already past it (a frame
    /// step longer than the window skipped over it). At most one zone
    /// resolves per call, and a further resolution needs the car to have
    /// advanced beyond the position of the previous one.
    pub fn check_and_resolve(
        &mut self,
        current_position: f64,
        proximity_radius: f64,
    ) -> Option<ResolvedZone> {
        if !current_position.is_finite() {
            return None;
        }
        if self
            .last_trigger
            .is_some_and(|last| current_position <= last)
        {
            return None;
        }
        let index = self.resolved;
        let zone = self.zones.get_mut(index)?;
        let reached = (current_position - zone.position).abs() < proximity_radius;
        let passed = current_position > zone.position;
        if !(reached || passed) {
            return None;
        }
        zone.resolved = true;
        self.resolved += 1;
        self.last_trigger = Some(current_position);
        Some(ResolvedZone {
            index,
            position: zone.position,
            question: zone.question.clone(),
        })
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.zones.len() - self.resolved
    }

    #[must_use]
    pub const fn resolved_count(&self) -> usize {
        self.resolved
    }

    #[must_use]
    pub fn all_resolved(&self) -> bool {
        self.resolved == self.zones.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    #[must_use]
    pub fn zones(&self) -> &[DecisionZone] {
        &self.zones
    }

    /// The zone the car is driving towards, if any.
    #[must_use]
    pub fn next_pending(&self) -> Option<&DecisionZone> {
        self.zones.get(self.resolved)
    }

    #[must_use]
    pub fn last_position(&self) -> Option<f64> {
        self.zones.last().map(|zone| zone.position)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: i64) -> Question {
        Question::new(id, format!("Question {id}?"))
    }

    fn registry_with(positions: &[f64]) -> ZoneRegistry {
        let mut registry = ZoneRegistry::new();
        for (i, &position) in positions.iter().enumerate() {
            registry
                .add_zone(q(i64::try_from(i).unwrap()), position)
                .unwrap();
        }
        registry
    }

    #[test]
    fn add_zone_rejects_non_monotonic_positions() {
        let mut registry = registry_with(&[150.0, 330.0]);
        assert_eq!(
            registry.add_zone(q(9), 330.0),
            Err(ZoneError::NonMonotonic {
                position: 330.0,
                last: 330.0
            })
        );
        assert_eq!(
            registry.add_zone(q(9), 10.0),
            Err(ZoneError::NonMonotonic {
                position: 10.0,
                last: 330.0
            })
        );
        assert!(matches!(
            registry.add_zone(q(9), f64::NAN),
            Err(ZoneError::NonFinite { .. })
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn resolves_in_addition_order_for_any_step() {
        for step in [0.05, 0.5, 1.0, 3.9, 7.0, 50.0, 400.0] {
            let mut registry = registry_with(&[150.0, 330.0, 510.0, 690.0]);
            let mut order = Vec::new();
            let mut position = 0.0;
            while position < 1_000.0 {
                if let Some(zone) = registry.check_and_resolve(position, 2.0) {
                    order.push(zone.index);
                }
                position += step;
            }
            while let Some(zone) = registry.check_and_resolve(position, 2.0) {
                order.push(zone.index);
                position += step;
            }
            assert_eq!(order, vec![0, 1, 2, 3], "step {step}");
            assert!(registry.all_resolved());
        }
    }

    #[test]
    fn overlapping_windows_resolve_one_zone_per_call() {
        let mut registry = registry_with(&[100.0, 100.1]);
        let first = registry.check_and_resolve(100.05, 2.0).unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(registry.resolved_count(), 1);
        assert_eq!(registry.pending_count(), 1);

        let second = registry.check_and_resolve(100.06, 2.0).unwrap();
        assert_eq!(second.index, 1);
        assert!(registry.all_resolved());
    }

    #[test]
    fn repeat_call_at_same_position_is_a_no_op() {
        let mut registry = registry_with(&[150.0, 330.0]);
        assert!(registry.check_and_resolve(149.5, 2.0).is_some());
        assert!(registry.check_and_resolve(149.5, 2.0).is_none());
        assert_eq!(registry.resolved_count(), 1);

        let mut overlapping = registry_with(&[100.0, 100.1]);
        assert!(overlapping.check_and_resolve(100.0, 2.0).is_some());
        assert!(overlapping.check_and_resolve(100.0, 2.0).is_none());
        assert_eq!(overlapping.resolved_count(), 1);
    }

    #[test]
    fn car_short_of_window_resolves_nothing() {
        let mut registry = registry_with(&[150.0]);
        assert!(registry.check_and_resolve(147.9, 2.0).is_none());
        assert!(registry.check_and_resolve(f64::NAN, 2.0).is_none());
        assert_eq!(registry.next_pending().map(|z| z.position), Some(150.0));
        assert!(registry.check_and_resolve(148.1, 2.0).is_some());
        assert!(registry.next_pending().is_none());
    }

    #[test]
    fn extend_continues_one_spacing_past_last_zone() {
        let mut registry = ZoneRegistry::new();
        let initial = registry.extend([q(1), q(2), q(3)], 150.0, 180.0).unwrap();
        assert_eq!(initial, 0..3);
        let positions: Vec<f64> = registry.zones().iter().map(|z| z.position).collect();
        assert_eq!(positions, vec![150.0, 330.0, 510.0]);

        let more = registry.extend([q(4), q(5)], 0.0, 180.0).unwrap();
        assert_eq!(more, 3..5);
        assert!((registry.zones()[3].position - 690.0).abs() < f64::EPSILON);
        assert!((registry.zones()[4].position - 870.0).abs() < f64::EPSILON);
        assert_eq!(registry.pending_count(), 5);
    }

    #[test]
    fn extend_never_places_zones_behind_start_position() {
        let mut registry = registry_with(&[150.0]);
        let range = registry.extend([q(2)], 1_000.0, 180.0).unwrap();
        assert_eq!(range, 1..2);
        assert!((registry.zones()[1].position - 1_000.0).abs() < f64::EPSILON);

        assert_eq!(
            registry.extend([q(3)], 0.0, 0.0),
            Err(ZoneError::InvalidSpacing { spacing: 0.0 })
        );
    }

    #[test]
    fn clear_resets_progress() {
        let mut registry = registry_with(&[150.0]);
        let _ = registry.check_and_resolve(150.0, 2.0);
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.resolved_count(), 0);
        registry.add_zone(q(1), 10.0).unwrap();
        assert!(registry.check_and_resolve(10.0, 2.0).is_some());
    }
}
