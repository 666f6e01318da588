//! Control server (status + snapshot)

pub mod server;

pub use server::{create_app, AppState};
