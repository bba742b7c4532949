//! Spray Sequence
//!
//! One press of the spray trigger: stop the drive motors, push the spray servo
//! out, pull it back, then let it rest. Each hold is a wall-clock duration
//! measured from the moment the phase was entered, so a late poll can only
//! lengthen a phase, never shorten it.
//!
//! ```text
//!  start()          +SPRAY_EXTEND        +SPRAY_RETRACT
//!    | Enter: drive neutral
//!    | Extend ---------> Retract ---------> Settled
//!                                             spray neutral
//! ```
//!
//! A run never preempts itself: the owner keeps calling [`SprayRun::advance`]
//! until it reports [`SprayStep::Settled`].

use crate::system::actuator::{self, Actuator, Channel};
use crate::system::config;
use crate::system::duty::DutyTable;
use crate::{log_debug, log_info};
use embassy_time::{Duration, Instant};

/// Phases of a spray run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum SprayPhase {
    /// Servo pushed out
    Extend,
    /// Servo pulled back
    Retract,
    /// Servo resting, run complete
    Settled,
}

/// Outcome of one [`SprayRun::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprayStep {
    /// Still inside a timed hold
    Holding,
    /// Servo is back at rest
    Settled,
}

/// Hold durations of the two timed phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprayTiming {
    pub extend: Duration,
    pub retract: Duration,
}

impl Default for SprayTiming {
    fn default() -> Self {
        Self {
            extend: config::SPRAY_EXTEND,
            retract: config::SPRAY_RETRACT,
        }
    }
}

/// An in-flight spray run
#[derive(Debug)]
pub struct SprayRun {
    phase: SprayPhase,
    phase_started: Instant,
    timing: SprayTiming,
}

impl SprayRun {
    /// Enters the sequence: drive motors to neutral, servo to extend.
    pub fn start<A: Actuator>(
        now: Instant,
        timing: SprayTiming,
        actuator: &mut A,
        duties: &DutyTable,
    ) -> actuator::Result<Self> {
        log_info!("spray: stopping drive");
        actuator.drive(duties.neutral, duties.neutral)?;

        log_info!("spray: extend");
        actuator.set_duty(Channel::Spray, duties.spray_extend)?;

        Ok(Self {
            phase: SprayPhase::Extend,
            phase_started: now,
            timing,
        })
    }

    pub fn phase(&self) -> SprayPhase {
        self.phase
    }

    /// Instant the current phase was entered
    pub fn phase_started(&self) -> Instant {
        self.phase_started
    }

    /// Moves to the next phase once the current hold has elapsed.
    ///
    /// At most one phase transition happens per call, so every phase is
    /// written to the servo even if the caller was delayed past two deadlines.
    pub fn advance<A: Actuator>(
        &mut self,
        now: Instant,
        actuator: &mut A,
        duties: &DutyTable,
    ) -> actuator::Result<SprayStep> {
        let held = now.saturating_duration_since(self.phase_started);

        match self.phase {
            SprayPhase::Extend if held >= self.timing.extend => {
                log_info!("spray: retract after {} ms", held.as_millis());
                actuator.set_duty(Channel::Spray, duties.spray_retract)?;
                self.enter(SprayPhase::Retract, now);
                Ok(SprayStep::Holding)
            }
            SprayPhase::Retract if held >= self.timing.retract => {
                log_info!("spray: settle after {} ms", held.as_millis());
                actuator.set_duty(Channel::Spray, duties.spray_neutral)?;
                self.enter(SprayPhase::Settled, now);
                Ok(SprayStep::Settled)
            }
            SprayPhase::Settled => Ok(SprayStep::Settled),
            _ => Ok(SprayStep::Holding),
        }
    }

    fn enter(&mut self, phase: SprayPhase, now: Instant) {
        log_debug!("spray phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.phase_started = now;
    }
}
