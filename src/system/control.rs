//! Control Request Handling
//!
//! Maps raw HTTP requests from the control panel onto the command store.
//!
//! | Request | Effect | Response |
//! |---|---|---|
//! | `GET /` | none | 200, control panel |
//! | `GET /cmd?c=<token>` | store updated | 200, `OK` |
//! | anything else | none | 404 |
//!
//! A missing, malformed or unknown `c` value is a stop request. Ambiguous
//! input must never leave the robot in its previous, possibly moving, state.

use crate::system::command::Command;
use crate::system::command_store::CommandStore;
use crate::{log_debug, log_info};
use core::fmt::Write;
use heapless::String;

/// Control panel served on `/`
pub const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Longest rendered response head
pub const HEAD_CAPACITY: usize = 128;

/// Where a request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum Route {
    /// Control panel page
    Index,
    /// Command request, token already resolved
    Command(Command),
    /// Unknown path, method or unparsable request
    NotFound,
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn line(self) -> &'static str {
        match self {
            Status::Ok => "200 OK",
            Status::NotFound => "404 Not Found",
        }
    }
}

/// A complete response with a static body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: &'static [u8],
}

impl Response {
    pub const fn ok_text(body: &'static str) -> Self {
        Self {
            status: Status::Ok,
            content_type: "text/plain",
            body: body.as_bytes(),
        }
    }

    pub const fn page() -> Self {
        Self {
            status: Status::Ok,
            content_type: "text/html; charset=utf-8",
            body: INDEX_HTML.as_bytes(),
        }
    }

    pub const fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            content_type: "text/plain",
            body: b"Not Found",
        }
    }

    /// Status line and headers, ending with the blank line
    pub fn head(&self) -> String<HEAD_CAPACITY> {
        let mut head = String::new();
        let written = write!(
            head,
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.line(),
            self.content_type,
            self.body.len()
        );
        debug_assert!(written.is_ok(), "response head exceeds {} bytes", HEAD_CAPACITY);
        head
    }
}

/// Resolves the route of a raw request.
///
/// Only the request line is inspected; headers and body are ignored.
pub fn route(request: &[u8]) -> Route {
    let line_end = request
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(request.len());
    let Ok(line) = core::str::from_utf8(&request[..line_end]) else {
        return Route::NotFound;
    };

    let mut parts = line.split_ascii_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Route::NotFound;
    };
    if method != "GET" {
        return Route::NotFound;
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    match path {
        "/" => Route::Index,
        "/cmd" => Route::Command(command_from_query(query)),
        _ => Route::NotFound,
    }
}

/// Extracts the `c` parameter of a query string, defaulting to `Stop`.
pub fn command_from_query(query: Option<&str>) -> Command {
    let token = query.and_then(|query| {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "c")
            .map(|(_, value)| value)
    });

    match token.and_then(Command::from_token) {
        Some(command) => command,
        None => {
            log_debug!("no usable command in query, stopping");
            Command::Stop
        }
    }
}

/// Handles one request: updates the store for command requests, then
/// returns the response to send.
pub fn handle(request: &[u8], store: &CommandStore) -> Response {
    match route(request) {
        Route::Index => Response::page(),
        Route::Command(command) => {
            log_info!("received command {:?}", command);
            store.set(command);
            Response::ok_text("OK")
        }
        Route::NotFound => Response::not_found(),
    }
}
