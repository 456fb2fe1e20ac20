use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

use super::models::Verdict;

/// Wheel angles where a losing spin may stop
pub const LOSE_STOPS: [i64; 2] = [0, -107];

/// Wheel angles where a winning spin may stop
pub const WIN_STOPS: [i64; 3] = [50, -55, 100];

/// Full turns added before landing
pub const EXTRA_SPINS: RangeInclusive<i64> = 13..=15;

/// The main phase runs this far past the stop before settling back
pub const OVERSHOOT_DEGREES: i64 = 6;

/// Wind-up rotation before the main spin
pub const PRELOAD_DEGREES: i64 = 40;

pub const PRELOAD_DURATION: Duration = Duration::from_millis(220);
pub const MAIN_DURATION: Duration = Duration::from_millis(6700);
pub const SETTLE_DURATION: Duration = Duration::from_millis(180);

pub fn stop_angles(verdict: Verdict) -> &'static [i64] {
    match verdict {
        Verdict::Win => &WIN_STOPS,
        Verdict::Lose => &LOSE_STOPS,
    }
}

/// Flavor text shown for the angle the wheel stopped on
pub fn spin_message(angle: i64) -> Option<&'static str> {
    match angle {
        0 => Some("🏹 Uh oh, Cupid's arrow broke mid-flight!"),
        -107 => Some("🔐 Oh no! The vault jammed when you tried to open it!"),
        50 => Some("💖 Cupid gave you his blessing to unlock the vault!"),
        100 => Some("🎯 Cupid shot for the target and nailed it! Yipee!"),
        -55 => Some("✉️ Yay, you found Cupid's lost love letter!"),
        _ => None,
    }
}

/// One animated segment of a spin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPhase {
    /// Absolute wheel rotation at the end of the phase, in degrees
    pub rotation: i64,
    pub duration: Duration,
    /// CSS timing function a renderer can apply
    pub easing: &'static str,
}

/// A fully computed spin from the current rotation to a stop angle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPlan {
    pub verdict: Verdict,
    pub start_rotation: i64,
    pub target_angle: i64,
    pub extra_spins: i64,
    pub final_rotation: i64,
    pub overshoot: i64,
}

impl SpinPlan {
    /// Computes the landing rotation for a target angle
    ///
    /// The wheel turns backwards `extra_spins` full turns and lands so that
    /// `final_rotation` is congruent to `target_angle` modulo 360.
    pub fn compute(verdict: Verdict, start_rotation: i64, target_angle: i64, extra_spins: i64) -> Self {
        let normalized = start_rotation.rem_euclid(360);
        let final_rotation = start_rotation - extra_spins * 360 + (target_angle - normalized);

        Self {
            verdict,
            start_rotation,
            target_angle,
            extra_spins,
            final_rotation,
            overshoot: final_rotation - OVERSHOOT_DEGREES,
        }
    }

    /// Wind-up, main spin past the stop, settle back onto it
    pub fn phases(&self) -> [SpinPhase; 3] {
        [
            SpinPhase {
                rotation: self.start_rotation + PRELOAD_DEGREES,
                duration: PRELOAD_DURATION,
                easing: "cubic-bezier(0.4, 0, 0.6, 1)",
            },
            SpinPhase {
                rotation: self.overshoot,
                duration: MAIN_DURATION,
                easing: "cubic-bezier(0.15, 0.85, 0.25, 1)",
            },
            SpinPhase {
                rotation: self.final_rotation,
                duration: SETTLE_DURATION,
                easing: "ease-out",
            },
        ]
    }

    pub fn total_duration(&self) -> Duration {
        self.phases().iter().map(|phase| phase.duration).sum()
    }

    pub fn message(&self) -> Option<&'static str> {
        spin_message(self.target_angle)
    }
}

/// Rotation state of the prize wheel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wheel {
    rotation: i64,
    spinning: bool,
}

impl Wheel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rotation(&self) -> i64 {
        self.rotation
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    /// Starts a spin towards a random stop for the verdict
    ///
    /// Returns None while a previous spin has not settled.
    pub fn plan_spin<R: Rng + ?Sized>(&mut self, verdict: Verdict, rng: &mut R) -> Option<SpinPlan> {
        if self.spinning {
            return None;
        }

        let stops = stop_angles(verdict);
        let target_angle = stops[rng.random_range(0..stops.len())];
        let extra_spins = rng.random_range(EXTRA_SPINS);

        self.spinning = true;
        Some(SpinPlan::compute(
            verdict,
            self.rotation,
            target_angle,
            extra_spins,
        ))
    }

    /// Lands the wheel on the plan's final rotation
    pub fn settle(&mut self, plan: &SpinPlan) {
        self.rotation = plan.final_rotation;
        self.spinning = false;
    }
}
