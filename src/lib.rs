//! Memberauth - Member Account and Session Token Service
//!
//! Signup, credential login, JWT access/refresh token issuing and refresh
//! token rotation, served over a small JSON API.

pub mod core;
