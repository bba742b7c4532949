//! Actuation Loop
//!
//! Turns the requested command into PWM output. The loop polls the command
//! store at a fixed period and acts on transitions only: a command that is
//! requested again while already applied causes no hardware write.
//!
//! `Spray` starts a [`SprayRun`] that the loop keeps as a handle and advances
//! on every poll. While the run is alive, drive requests are recorded in the
//! store but not acted on. When the run settles the store is reset to `Stop`,
//! so whatever was requested in the meantime is discarded.
//!
//! Every actuator write happens on this loop, so each output has exactly one
//! writer.

use crate::system::actuator::{Actuator, ActuatorError, Channel};
use crate::system::command::Command;
use crate::system::command_store::CommandStore;
use crate::system::config;
use crate::system::duty::DutyTable;
use crate::system::spray::{SprayRun, SprayStep, SprayTiming};
use crate::{log_error, log_info, log_warn};
use core::fmt;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};

/// Signal asking the actuation loop to park the robot and return
pub static SHUTDOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Requests a graceful shutdown
///
/// A running spray sequence is finished first; the loop never leaves the
/// servo mid-stroke.
pub fn request_shutdown() {
    SHUTDOWN.signal(());
}

/// Errors raised while acting on a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum ActuationError {
    /// Applying a drive command failed
    Drive(Command, ActuatorError),
    /// The spray sequence was aborted
    Spray(ActuatorError),
}

impl fmt::Display for ActuationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuationError::Drive(command, err) => {
                write!(f, "applying {:?} failed: {}", command, err)
            }
            ActuationError::Spray(err) => write!(f, "spray aborted: {}", err),
        }
    }
}

/// Left and right drive duties for a command, `None` for `Spray`
pub fn drive_duties(duties: &DutyTable, command: Command) -> Option<(u16, u16)> {
    match command {
        Command::Stop => Some((duties.neutral, duties.neutral)),
        Command::Forward => Some((duties.forward, duties.right_forward())),
        Command::Backward => Some((duties.reverse, duties.right_reverse())),
        Command::TurnLeft => Some((duties.reverse, duties.right_forward())),
        Command::TurnRight => Some((duties.forward, duties.right_reverse())),
        Command::Spray => None,
    }
}

/// Edge-triggered command applier
pub struct ActuationLoop<'a, A: Actuator> {
    store: &'a CommandStore,
    actuator: A,
    duties: DutyTable,
    timing: SprayTiming,
    last_applied: Option<Command>,
    spray: Option<SprayRun>,
    draining: bool,
}

impl<'a, A: Actuator> ActuationLoop<'a, A> {
    pub fn new(store: &'a CommandStore, actuator: A, duties: DutyTable) -> Self {
        Self {
            store,
            actuator,
            duties,
            timing: SprayTiming::default(),
            last_applied: None,
            spray: None,
            draining: false,
        }
    }

    pub fn with_spray_timing(mut self, timing: SprayTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Command most recently acted on, `None` before the first poll
    pub fn last_applied(&self) -> Option<Command> {
        self.last_applied
    }

    /// True while a spray run is in flight
    pub fn is_spraying(&self) -> bool {
        self.spray.is_some()
    }

    /// Runs the loop until a shutdown is signalled and any spray run has settled.
    ///
    /// All outputs are parked at neutral before returning.
    pub async fn run(&mut self, shutdown: &Signal<CriticalSectionRawMutex, ()>) {
        log_info!("actuation loop started, poll every {} ms", config::POLL_PERIOD.as_millis());

        loop {
            if !self.draining && shutdown.signaled() {
                log_info!("shutdown requested, draining");
                self.draining = true;
            }

            if let Err(err) = self.poll(Instant::now()) {
                log_error!("actuation error: {:?}", err);
            }

            if self.draining && !self.is_spraying() {
                self.force_neutral();
                log_info!("actuation loop stopped");
                return;
            }

            Timer::after(config::POLL_PERIOD).await;
        }
    }

    /// One iteration: advance a running spray, then act on a changed request.
    pub fn poll(&mut self, now: Instant) -> Result<(), ActuationError> {
        if let Some(run) = self.spray.as_mut() {
            match run.advance(now, &mut self.actuator, &self.duties) {
                Ok(SprayStep::Holding) => return Ok(()),
                Ok(SprayStep::Settled) => {
                    self.spray = None;
                    self.store.set(Command::Stop);
                    log_info!("spray complete, command reset to Stop");
                }
                Err(err) => {
                    self.spray = None;
                    self.abort();
                    return Err(ActuationError::Spray(err));
                }
            }
        }

        if self.draining {
            return Ok(());
        }

        let requested = self.store.get();
        if self.last_applied == Some(requested) {
            return Ok(());
        }

        log_info!("command {:?} -> {:?}", self.last_applied, requested);
        self.last_applied = Some(requested);

        match drive_duties(&self.duties, requested) {
            Some((left, right)) => {
                if let Err(err) = self.actuator.drive(left, right) {
                    self.force_neutral();
                    return Err(ActuationError::Drive(requested, err));
                }
            }
            None => match SprayRun::start(now, self.timing, &mut self.actuator, &self.duties) {
                Ok(run) => self.spray = Some(run),
                Err(err) => {
                    self.abort();
                    return Err(ActuationError::Spray(err));
                }
            },
        }

        Ok(())
    }

    /// Stops a failed spray: every output to neutral and the request back to `Stop`
    fn abort(&mut self) {
        self.force_neutral();
        self.store.set(Command::Stop);
    }

    /// Writes neutral to every output, continuing past failed writes
    fn force_neutral(&mut self) {
        for channel in Channel::ALL {
            let duty = match channel {
                Channel::Spray => self.duties.spray_neutral,
                _ => self.duties.neutral,
            };
            if let Err(err) = self.actuator.set_duty(channel, duty) {
                log_warn!("could not neutralize {:?}: {:?}", channel, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::actuator::mock::MockActuator;
    use crate::system::control::{self, Status};
    use crate::system::spray::SprayPhase;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_time::Duration;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn setup(store: &CommandStore) -> (ActuationLoop<'_, MockActuator>, MockActuator, DutyTable) {
        let actuator = MockActuator::new();
        let duties = DutyTable::from_config();
        let lp = ActuationLoop::new(store, actuator.clone(), duties);
        (lp, actuator, duties)
    }

    #[test]
    fn test_drive_mapping_table() {
        let d = DutyTable::from_config();
        assert_eq!(drive_duties(&d, Command::Stop), Some((d.neutral, d.neutral)));
        assert_eq!(drive_duties(&d, Command::Forward), Some((d.forward, d.forward)));
        assert_eq!(drive_duties(&d, Command::Backward), Some((d.reverse, d.reverse)));
        assert_eq!(drive_duties(&d, Command::TurnLeft), Some((d.reverse, d.forward)));
        assert_eq!(drive_duties(&d, Command::TurnRight), Some((d.forward, d.reverse)));
        assert_eq!(drive_duties(&d, Command::Spray), None);
    }

    #[test]
    fn test_mirrored_right_motor_mapping() {
        let d = DutyTable::from_config().with_right_inverted(true);
        assert_eq!(drive_duties(&d, Command::Forward), Some((d.forward, d.reverse)));
        assert_eq!(drive_duties(&d, Command::TurnLeft), Some((d.reverse, d.reverse)));
        assert_eq!(drive_duties(&d, Command::TurnRight), Some((d.forward, d.forward)));
        assert_eq!(drive_duties(&d, Command::Stop), Some((d.neutral, d.neutral)));
    }

    #[test]
    fn test_first_poll_applies_stop() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        assert_eq!(lp.last_applied(), None);

        lp.poll(at(0)).unwrap();

        assert_eq!(lp.last_applied(), Some(Command::Stop));
        assert_eq!(
            actuator.writes(),
            vec![(Channel::LeftMotor, d.neutral), (Channel::RightMotor, d.neutral)]
        );
    }

    #[test]
    fn test_same_command_applied_once() {
        let store = CommandStore::new();
        let (mut lp, actuator, _) = setup(&store);
        lp.poll(at(0)).unwrap();
        actuator.clear();

        store.set(Command::Forward);
        lp.poll(at(10)).unwrap();
        store.set(Command::Forward);
        lp.poll(at(20)).unwrap();
        lp.poll(at(30)).unwrap();

        assert_eq!(actuator.write_count(Channel::LeftMotor), 1);
        assert_eq!(actuator.write_count(Channel::RightMotor), 1);
    }

    #[test]
    fn test_each_transition_is_applied() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);

        store.set(Command::TurnLeft);
        lp.poll(at(0)).unwrap();
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.reverse));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.forward));

        store.set(Command::Backward);
        lp.poll(at(10)).unwrap();
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.reverse));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.reverse));

        store.set(Command::Stop);
        lp.poll(at(20)).unwrap();
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.write_count(Channel::LeftMotor), 3);
    }

    #[test]
    fn test_spray_runs_full_sequence_and_resets_to_stop() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        store.set(Command::Forward);
        lp.poll(at(0)).unwrap();
        actuator.clear();

        store.set(Command::Spray);
        lp.poll(at(100)).unwrap();
        assert!(lp.is_spraying());
        assert_eq!(lp.last_applied(), Some(Command::Spray));

        // Holding through the extend phase
        let mut t = 110;
        while t < 1600 {
            lp.poll(at(t)).unwrap();
            assert_eq!(store.get(), Command::Spray);
            t += 10;
        }
        // Holding through the retract phase
        while t < 2800 {
            lp.poll(at(t)).unwrap();
            assert_eq!(store.get(), Command::Spray);
            t += 10;
        }
        lp.poll(at(2800)).unwrap();
        assert!(!lp.is_spraying());
        assert_eq!(store.get(), Command::Stop);
        assert_eq!(lp.last_applied(), Some(Command::Stop));

        assert_eq!(
            actuator.writes(),
            vec![
                // Enter
                (Channel::LeftMotor, d.neutral),
                (Channel::RightMotor, d.neutral),
                // Extend
                (Channel::Spray, d.spray_extend),
                // Retract at +1500 ms
                (Channel::Spray, d.spray_retract),
                // Settle at +2700 ms
                (Channel::Spray, d.spray_neutral),
                // Stop applied after the reset
                (Channel::LeftMotor, d.neutral),
                (Channel::RightMotor, d.neutral),
            ]
        );
    }

    #[test]
    fn test_spray_phase_boundaries() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        store.set(Command::Spray);
        lp.poll(at(1000)).unwrap();

        lp.poll(at(2499)).unwrap();
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_extend));
        lp.poll(at(2500)).unwrap();
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_retract));
        lp.poll(at(3699)).unwrap();
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_retract));
        assert_eq!(store.get(), Command::Spray);
        lp.poll(at(3700)).unwrap();
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_neutral));
        assert_eq!(store.get(), Command::Stop);
    }

    #[test]
    fn test_drive_requests_during_spray_are_discarded() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        store.set(Command::Spray);
        lp.poll(at(0)).unwrap();

        store.set(Command::Forward);
        lp.poll(at(500)).unwrap();
        store.set(Command::TurnRight);
        lp.poll(at(1600)).unwrap();

        // Drive outputs untouched since Enter
        assert_eq!(actuator.write_count(Channel::LeftMotor), 1);
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.neutral));
        assert_eq!(store.get(), Command::TurnRight);

        lp.poll(at(2800)).unwrap();
        // The request made during the run is lost, not queued
        assert_eq!(store.get(), Command::Stop);
        assert_eq!(lp.last_applied(), Some(Command::Stop));
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.neutral));
    }

    #[test]
    fn test_repeated_spray_request_starts_one_run() {
        let store = CommandStore::new();
        let (mut lp, actuator, _) = setup(&store);
        store.set(Command::Spray);
        lp.poll(at(0)).unwrap();
        store.set(Command::Spray);
        lp.poll(at(10)).unwrap();
        lp.poll(at(20)).unwrap();

        assert_eq!(actuator.write_count(Channel::Spray), 1);
    }

    #[test]
    fn test_spray_can_run_again_after_settling() {
        let store = CommandStore::new();
        let (mut lp, actuator, _) = setup(&store);
        store.set(Command::Spray);
        lp.poll(at(0)).unwrap();
        lp.poll(at(1500)).unwrap();
        lp.poll(at(2700)).unwrap();
        assert_eq!(lp.last_applied(), Some(Command::Stop));

        store.set(Command::Spray);
        lp.poll(at(3000)).unwrap();
        assert!(lp.is_spraying());
        assert_eq!(actuator.write_count(Channel::Spray), 4);
    }

    #[test]
    fn test_drive_failure_forces_neutral_without_retry() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        lp.poll(at(0)).unwrap();
        actuator.clear();
        actuator.fail_on(Channel::RightMotor);

        store.set(Command::Forward);
        let err = lp.poll(at(10)).unwrap_err();
        assert_eq!(
            err,
            ActuationError::Drive(Command::Forward, ActuatorError::WriteFailed(Channel::RightMotor))
        );
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_neutral));

        // Not retried on the next poll
        let writes = actuator.writes().len();
        lp.poll(at(20)).unwrap();
        assert_eq!(actuator.writes().len(), writes);
        assert_eq!(lp.last_applied(), Some(Command::Forward));
    }

    #[test]
    fn test_spray_failure_aborts_to_neutral() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        store.set(Command::Spray);
        lp.poll(at(0)).unwrap();

        actuator.fail_on(Channel::Spray);
        let err = lp.poll(at(1500)).unwrap_err();
        assert_eq!(err, ActuationError::Spray(ActuatorError::WriteFailed(Channel::Spray)));
        assert!(!lp.is_spraying());
        assert_eq!(store.get(), Command::Stop);
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.neutral));
    }

    #[test]
    fn test_spray_start_failure_aborts() {
        let store = CommandStore::new();
        let (mut lp, actuator, _) = setup(&store);
        actuator.fail_on(Channel::Spray);
        store.set(Command::Spray);

        assert!(matches!(lp.poll(at(0)), Err(ActuationError::Spray(_))));
        assert!(!lp.is_spraying());
        assert_eq!(store.get(), Command::Stop);
    }

    #[test]
    fn test_error_display() {
        let err = ActuationError::Spray(ActuatorError::WriteFailed(Channel::Spray));
        assert_eq!(std::format!("{}", err), "spray aborted: duty write to Spray failed");
    }

    #[test]
    fn test_run_drains_spray_before_stopping() {
        SHUTDOWN.reset();
        let store = CommandStore::new();
        let actuator = MockActuator::new();
        let d = DutyTable::from_config();
        let timing = SprayTiming {
            extend: Duration::from_millis(150),
            retract: Duration::from_millis(120),
        };
        let mut lp = ActuationLoop::new(&store, actuator.clone(), d).with_spray_timing(timing);

        let controller = async {
            store.set(Command::TurnLeft);
            Timer::after(Duration::from_millis(50)).await;
            assert_eq!(actuator.last(Channel::LeftMotor), Some(d.reverse));
            assert_eq!(actuator.last(Channel::RightMotor), Some(d.forward));

            store.set(Command::Spray);
            Timer::after(Duration::from_millis(50)).await;
            assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
            assert_eq!(actuator.last(Channel::Spray), Some(d.spray_extend));

            // Ask to stop mid-extend; the run must still complete
            request_shutdown();
        };

        let started = Instant::now();
        block_on(join(lp.run(&SHUTDOWN), controller));

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(!lp.is_spraying());
        assert_eq!(store.get(), Command::Stop);

        let spray: Vec<u16> = actuator
            .writes()
            .into_iter()
            .filter(|(channel, _)| *channel == Channel::Spray)
            .map(|(_, duty)| duty)
            .collect();
        assert_eq!(spray[..3], [d.spray_extend, d.spray_retract, d.spray_neutral]);
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_neutral));
        SHUTDOWN.reset();
    }

    #[test]
    fn test_run_stops_when_idle() {
        let store = CommandStore::new();
        let shutdown = Signal::<CriticalSectionRawMutex, ()>::new();
        let (mut lp, actuator, d) = setup(&store);
        store.set(Command::Forward);
        shutdown.signal(());

        block_on(lp.run(&shutdown));

        // Draining starts before the first poll, so Forward is never acted on
        assert_eq!(lp.last_applied(), None);
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.write_count(Channel::LeftMotor), 1);
    }

    #[test]
    fn test_spray_phase_visible_through_loop() {
        let store = CommandStore::new();
        let (mut lp, _, _) = setup(&store);
        store.set(Command::Spray);
        lp.poll(at(0)).unwrap();
        assert_eq!(lp.spray.as_ref().map(|run| run.phase()), Some(SprayPhase::Extend));
        lp.poll(at(1500)).unwrap();
        assert_eq!(lp.spray.as_ref().map(|run| run.phase()), Some(SprayPhase::Retract));
    }

    #[test]
    fn test_panel_requests_drive_then_spray() {
        let store = CommandStore::new();
        let (mut lp, actuator, d) = setup(&store);
        let get = |target: &str| std::format!("GET {} HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n", target);

        let response = control::handle(get("/cmd?c=turn_left").as_bytes(), &store);
        assert_eq!(response.status, Status::Ok);
        lp.poll(at(0)).unwrap();
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.reverse));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.forward));

        control::handle(get("/cmd?c=spray").as_bytes(), &store);
        lp.poll(at(10)).unwrap();
        assert!(lp.is_spraying());
        assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::RightMotor), Some(d.neutral));
        assert_eq!(actuator.last(Channel::Spray), Some(d.spray_extend));

        let mut t = 20;
        while lp.is_spraying() {
            lp.poll(at(t)).unwrap();
            assert_eq!(actuator.last(Channel::LeftMotor), Some(d.neutral));
            t += 10;
        }
        // Retract settles on the poll at +2700 ms
        assert_eq!(t, 2720);
        assert_eq!(store.get(), Command::Stop);
        assert_eq!(lp.last_applied(), Some(Command::Stop));

        let spray: Vec<u16> = actuator
            .writes()
            .into_iter()
            .filter(|(channel, _)| *channel == Channel::Spray)
            .map(|(_, duty)| duty)
            .collect();
        assert_eq!(spray, [d.spray_extend, d.spray_retract, d.spray_neutral]);
    }
}
