//! Booking Gate Library
//!
//! JWT-based access control for the booking marketplace: the edge gate that
//! runs in front of the web application, and the client-side session, route
//! guard and API client that mirror it after the first page load.

pub mod auth;
pub mod client;
pub mod config;
pub mod middleware;
pub mod server;

pub use auth::{Gate, GateDecision, Role, RouteTable, TokenDecoder};
pub use config::GateConfig;
