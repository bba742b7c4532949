//! HTTP Control Server
//!
//! Serves the control panel and accepts command requests. Each worker handles
//! one connection at a time; a second worker keeps the panel reachable while
//! the first waits on an idle connection. Every request is answered and then
//! the connection is closed.

use crate::system::command_store::COMMAND;
use crate::system::config;
use crate::system::control::{self, Response};
use crate::{log_info, log_warn};
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::Stack;
use embedded_io_async::Write;

#[embassy_executor::task(pool_size = config::HTTP_WORKERS)]
pub async fn http_server(stack: Stack<'static>, worker: usize) {
    stack.wait_config_up().await;
    log_info!("HTTP worker {} listening on port {}", worker, config::HTTP_PORT);

    let mut rx_buffer = [0u8; 1024];
    let mut tx_buffer = [0u8; 2048];
    let mut request = [0u8; config::HTTP_REQUEST_MAX];

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(config::HTTP_SOCKET_TIMEOUT));

        if let Err(err) = socket.accept(config::HTTP_PORT).await {
            log_warn!("HTTP accept error: {:?}", err);
            continue;
        }

        let len = match read_request(&mut socket, &mut request).await {
            Ok(0) => {
                socket.close();
                continue;
            }
            Ok(len) => len,
            Err(err) => {
                log_warn!("HTTP read error: {:?}", err);
                socket.abort();
                continue;
            }
        };

        let response = control::handle(&request[..len], &COMMAND);
        if let Err(err) = write_response(&mut socket, &response).await {
            log_warn!("HTTP write error: {:?}", err);
            socket.abort();
            continue;
        }

        socket.close();
    }
}

/// Reads until the end of the request head or until `buf` is full.
async fn read_request(socket: &mut TcpSocket<'_>, buf: &mut [u8]) -> Result<usize, TcpError> {
    let mut len = 0;
    while len < buf.len() {
        let n = socket.read(&mut buf[len..]).await?;
        if n == 0 {
            break;
        }
        len += n;
        if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    Ok(len)
}

async fn write_response(socket: &mut TcpSocket<'_>, response: &Response) -> Result<(), TcpError> {
    socket.write_all(response.head().as_bytes()).await?;
    socket.write_all(response.body).await?;
    socket.flush().await
}
