//! Actuation Task
//!
//! Owns the PWM outputs and runs the actuation loop against the global
//! command store for the lifetime of the firmware.

use crate::log_info;
use crate::system::actuation::{ActuationLoop, SHUTDOWN};
use crate::system::command_store::COMMAND;
use crate::system::duty::DutyTable;
use crate::system::motor::PwmActuator;
use crate::system::resources::ActuatorResources;

#[embassy_executor::task]
pub async fn actuate(r: ActuatorResources) {
    let duties = DutyTable::from_config();
    log_info!(
        "duties: neutral {} forward {} reverse {} spray {}/{}/{}",
        duties.neutral,
        duties.forward,
        duties.reverse,
        duties.spray_neutral,
        duties.spray_extend,
        duties.spray_retract
    );

    let actuator = PwmActuator::new(r);
    let mut actuation = ActuationLoop::new(&COMMAND, actuator, duties);
    actuation.run(&SHUTDOWN).await;

    log_info!("actuation task finished, outputs parked");
}
