//! Blog API with an account/authentication core: Argon2 password hashing,
//! HS256 bearer tokens and a typed auth gate over axum.

pub mod app;
pub mod auth;
pub mod blogs;
pub mod config;
pub mod error;
pub mod response;
pub mod state;
pub mod store;
pub mod users;

pub use app::build_app;
pub use config::AppConfig;
pub use state::AppState;
