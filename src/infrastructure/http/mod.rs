//! HTTP Layer - RESTful API + WebSocket
//!
//! 响应统一为 `{ errno, error, data }` 信封

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::{AppPorts, AppState};
