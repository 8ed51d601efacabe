//! Authentication Module
//! Mission: Gate page access on a cookie-held JWT, statelessly

pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod routes;

pub use gate::{Gate, GateDecision};
pub use jwt::{unix_now, TokenDecoder};
pub use middleware::{gate_middleware, EdgeGate};
pub use models::{Role, TokenClaims, TokenStatus};
pub use routes::{RouteClass, RouteTable};
