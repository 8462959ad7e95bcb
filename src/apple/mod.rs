//! Apple Music catalog and library access.

pub mod api;
pub mod auth;
pub mod models;

pub use api::AppleMusicClient;
pub use auth::AuthState;
