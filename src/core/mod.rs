//! Core domain: accounts, sessions and the HTTP surface around them

pub mod auth;
pub mod config;
pub mod db;
pub mod server;
pub mod store;
