//! Headless stand-in for the browser car controller.
use minddrift_game::{Answer, CarPosition};

pub const LANE_POSITIONS: [f64; 3] = [-7.5, 0.0, 7.5];
pub const FORWARD_SPEED: f64 = 50.0;
pub const LANE_SWITCH_SPEED: f64 = 10.0;

/// Three-lane car that drives forward at a constant speed and eases
/// towards its target lane. It only moves while running.
#[derive(Debug, Clone)]
pub struct LaneCar {
    lane: usize,
    distance: f64,
    lateral: f64,
    running: bool,
}

impl Default for LaneCar {
    fn default() -> Self {
        Self {
            lane: 1,
            distance: 0.0,
            lateral: LANE_POSITIONS[1],
            running: false,
        }
    }
}

impl LaneCar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn start(&mut self) {
        self.running = true;
    }

    pub const fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    pub const fn move_left(&mut self) {
        if self.running && self.lane > 0 {
            self.lane -= 1;
        }
    }

    pub const fn move_right(&mut self) {
        if self.running && self.lane < LANE_POSITIONS.len() - 1 {
            self.lane += 1;
        }
    }

    /// Press left or right once towards the lane that records `answer`.
    pub const fn steer_for(&mut self, answer: Answer) {
        let target = answer.lane_index();
        if target < self.lane {
            self.move_left();
        } else if target > self.lane {
            self.move_right();
        }
    }

    #[must_use]
    pub const fn target_lateral(&self) -> f64 {
        LANE_POSITIONS[self.lane]
    }

    pub fn update(&mut self, dt: f64) {
        if !self.running || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.distance += FORWARD_SPEED * dt;
        let blend = (LANE_SWITCH_SPEED * dt).min(1.0);
        self.lateral += (self.target_lateral() - self.lateral) * blend;
    }

    #[must_use]
    pub const fn position(&self) -> CarPosition {
        CarPosition::new(self.distance, self.lateral)
    }
}
