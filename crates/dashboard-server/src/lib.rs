//! Dashboard Server - HTTP surface for the faction leaderboard
//!
//! Endpoints:
//! - `GET /factions`, `POST /factions/refresh`: leaderboard display and manual refresh
//! - `POST /transactions`, `POST /visibility`: refresh triggers from the client
//! - `GET /participants/:address`: per-account status panel

pub mod error;
pub mod http_server;

pub use error::ApiError;
pub use http_server::{AppState, DashboardServer, FactionRow, FactionsView, RefreshResponse};

/// Default HTTP bind address
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8787";
