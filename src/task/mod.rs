//! Embassy tasks for the Pico 2 W
pub mod actuate;
pub mod dhcp_server;
pub mod http_server;
pub mod wifi;
