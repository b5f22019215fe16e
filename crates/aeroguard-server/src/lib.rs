//! Shared library surface for the AeroGuard server and its tests.

pub mod api;
pub mod backoff;
pub mod config;
pub mod link;
pub mod loops;
pub mod state;
pub mod weather;
