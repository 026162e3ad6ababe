//! WebSocket push channel (placeholder)

pub mod handler;
