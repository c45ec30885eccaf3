//! Transport: binary protocol, sessions, event fan-out, admin HTTP.

pub mod auth;
pub mod broadcast;
pub mod encode;
pub mod filter;
pub mod handlers;
pub mod http;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod worker;
