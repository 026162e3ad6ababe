//! Game state modules

pub mod session;
pub mod store;
pub mod wheel;

pub use session::SessionCoordinator;
pub use store::GameStore;
