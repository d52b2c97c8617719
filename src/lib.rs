//! blockbar
//!
//! A Pomodoro block timer that runs in the background, takes commands over a
//! local websocket, tracks which windows had focus during each block, and
//! prints one xmobar status line per second.

pub mod activity;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod hypr;
pub mod logging;
pub mod pomodoro;
pub mod status;
pub mod ws;
