pub mod chat;
pub mod events;
pub mod settings;

/// Version string baked in at compile time, compared against release tags.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
