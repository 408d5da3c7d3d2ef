pub mod error;
pub mod handlers;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use server::{serve, AppState};
pub use ws::apply_command;
