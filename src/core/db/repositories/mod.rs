//! Database repositories for memberauth
//!
//! PostgreSQL implementations of the store traits in [`crate::core::store`].

pub mod account;
pub mod refresh_token;

pub use account::PgAccountStore;
pub use refresh_token::PgRefreshTokenStore;
