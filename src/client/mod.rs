//! Client-side auth: the in-app mirror of the edge gate.
//!
//! The edge gate only sees document requests. Everything after the first
//! page load (route transitions, API calls, logout) is handled here.

pub mod api;
pub mod guard;
pub mod navigator;
pub mod session;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use guard::{GuardState, RouteGuard};
pub use navigator::{HistoryNavigator, NavigationKind, Navigator};
pub use session::AuthSession;
pub use state::{AuthAction, AuthStore, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenVault};
