//! Spray rover firmware entry point
//!
//! Initializes the board, brings up the access point and spawns the control
//! tasks.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use spray_rover::system::config;
use spray_rover::system::resources::{ActuatorResources, AssignedResources, WifiResources};
use spray_rover::task::{actuate::actuate, dhcp_server::dhcp_server, http_server::http_server, wifi};
use spray_rover::{log_error, log_info, split_resources};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    // Outputs go to neutral before the radio is up
    spawner.spawn(actuate(r.actuators).unwrap());

    let (stack, mut control) = match wifi::start_access_point(spawner, r.wifi).await {
        Ok(started) => started,
        Err(err) => {
            log_error!("access point failed to start: {:?}", err);
            return;
        }
    };

    spawner.spawn(dhcp_server(stack).unwrap());
    for worker in 0..config::HTTP_WORKERS {
        spawner.spawn(http_server(stack, worker).unwrap());
    }

    // On-board LED marks the access point as ready
    control.gpio_set(0, true).await;
    log_info!("spray rover ready");
}
