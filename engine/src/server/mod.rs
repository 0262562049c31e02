//! Admin surfaces exposed next to the monitor

pub mod http;
