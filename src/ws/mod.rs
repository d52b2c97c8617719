pub mod client;
pub mod websocket_server;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8766";
