//! Wi-Fi Access Point
//!
//! Brings up the CYW43439 radio as a WPA2 access point and the embassy-net
//! stack on a static address, so a phone can join the robot's own network
//! and open the control panel.
//!
//! # Bring-up Flow
//!
//! ```text
//! 1. Load CYW43439 firmware and CLM blobs
//! 2. Start the PIO SPI bus and the radio driver task
//! 3. Create the network stack (static 192.168.4.1/24) and its task
//! 4. Start the access point
//! ```

use crate::system::config;
use crate::system::resources::{Irqs, WifiResources};
use crate::{log_info, log_warn};
use cyw43::Control;
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, Ipv4Address, Ipv4Cidr, Stack, StackResources, StaticConfigV4};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_rp::pio::Pio;
use static_cell::StaticCell;

/// Sockets: the HTTP workers, DHCP and one spare
const STACK_SOCKETS: usize = config::HTTP_WORKERS + 2;

/// Seed for the stack's port and sequence randomization; nothing on the
/// robot's private network depends on it being unpredictable.
const STACK_SEED: u64 = 0x5eed_0f_5b7a_7e1d;

/// Access point start-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum WifiError {
    /// Passphrase outside the WPA2 8-63 character range
    InvalidPassphrase,
    /// Spawning a driver task failed
    SpawnFailed,
}

/// Starts the access point.
///
/// Returns the network stack and the radio control handle; the latter also
/// drives the on-board LED.
pub async fn start_access_point(
    spawner: Spawner,
    r: WifiResources,
) -> Result<(Stack<'static>, Control<'static>), WifiError> {
    if !(8..=63).contains(&config::AP_PASSWORD.len()) {
        log_warn!("access point passphrase must be 8-63 characters");
        return Err(WifiError::InvalidPassphrase);
    }

    let fw = include_bytes!("../../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(r.pwr_pin, Level::Low);
    let cs = Output::new(r.cs_pin, Level::High);
    let mut pio = Pio::new(r.pio, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        r.dio_pin,
        r.clk_pin,
        r.dma,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(wifi_task(runner).map_err(|_| WifiError::SpawnFailed)?);

    control.init(clm).await;

    let [a, b, c, d] = config::AP_ADDRESS;
    let address = Ipv4Address::new(a, b, c, d);
    let net_config = NetConfig::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(address, 24),
        gateway: Some(address),
        dns_servers: heapless::Vec::new(),
    });

    static RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        net_device,
        net_config,
        RESOURCES.init(StackResources::new()),
        STACK_SEED,
    );
    spawner.spawn(net_task(runner).map_err(|_| WifiError::SpawnFailed)?);

    control
        .start_ap_wpa2(config::AP_SSID, config::AP_PASSWORD, config::AP_CHANNEL)
        .await;
    log_info!(
        "access point {} up on channel {}, panel at http://{}.{}.{}.{}/",
        config::AP_SSID,
        config::AP_CHANNEL,
        a,
        b,
        c,
        d
    );

    Ok((stack, control))
}

/// Runs the CYW43439 driver event loop
#[embassy_executor::task]
async fn wifi_task(runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>) -> ! {
    runner.run().await
}

/// Runs the embassy-net stack
#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}
