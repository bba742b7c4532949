//! DHCP Server
//!
//! Leases addresses to controllers joining the access point, so a phone gets
//! an address without manual setup.

use crate::system::config;
use crate::{log_info, log_warn};
use core::net::Ipv4Addr;
use edge_dhcp::server::{Server, ServerOptions};
use edge_dhcp::{Options, Packet};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Ipv4Address, Stack};

/// Concurrent leases
const MAX_LEASES: usize = 8;

const DHCP_SERVER_PORT: u16 = 67;
const DHCP_CLIENT_PORT: u16 = 68;

fn ipv4(octets: [u8; 4]) -> Ipv4Addr {
    let [a, b, c, d] = octets;
    Ipv4Addr::new(a, b, c, d)
}

#[embassy_executor::task]
pub async fn dhcp_server(stack: Stack<'static>) {
    stack.wait_config_up().await;

    let mut rx_meta = [PacketMetadata::EMPTY; 2];
    let mut rx_buffer = [0u8; 600];
    let mut tx_meta = [PacketMetadata::EMPTY; 2];
    let mut tx_buffer = [0u8; 600];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buffer, &mut tx_meta, &mut tx_buffer);

    if let Err(err) = socket.bind(DHCP_SERVER_PORT) {
        log_warn!("DHCP bind failed: {:?}", err);
        return;
    }

    let server_ip = ipv4(config::AP_ADDRESS);
    let mut gateways = [server_ip];
    let options = ServerOptions::new(server_ip, Some(&mut gateways));

    let mut server = Server::<_, MAX_LEASES>::new_with_et(server_ip);
    server.range_start = ipv4(config::DHCP_RANGE_START);
    server.range_end = ipv4(config::DHCP_RANGE_END);

    log_info!("DHCP server running on port {}", DHCP_SERVER_PORT);

    let mut buf = [0u8; 600];
    loop {
        let (len, _meta) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                log_warn!("DHCP receive error: {:?}", err);
                continue;
            }
        };

        let request = match Packet::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(err) => {
                log_warn!("DHCP decode error: {}", defmt::Debug2Format(&err));
                continue;
            }
        };

        let mut opt_buf = Options::buf();
        let Some(reply) = server.handle_request(&mut opt_buf, &options, &request) else {
            continue;
        };

        let mut out = [0u8; 600];
        match reply.encode(&mut out) {
            Ok(encoded) => {
                let destination = (Ipv4Address::new(255, 255, 255, 255), DHCP_CLIENT_PORT);
                if let Err(err) = socket.send_to(encoded, destination).await {
                    log_warn!("DHCP send error: {:?}", err);
                }
            }
            Err(err) => log_warn!("DHCP encode error: {}", defmt::Debug2Format(&err)),
        }
    }
}
