//! Chase Game Server library
//!
//! Authoritative state for a location-based cat and mouse party game:
//! the player roster, play zone polygons, the single global session and
//! the role-selection wheel, exposed over HTTP/JSON.

pub mod app;
pub mod config;
pub mod events;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
