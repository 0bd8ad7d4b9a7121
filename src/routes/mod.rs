//! Router Module Index
//!
//! Routes are split by the access policy the gate enforces on their path prefix. The
//! gate itself is applied once, over the merged router, in `create_router`.

/// Routes open to anonymous visitors.
pub mod public;

/// Routes under `/dashboard`. The gate requires a valid session.
pub mod authenticated;

/// Routes under `/admin`. The gate requires the `Admin` role, except for the login,
/// setup and connection test pages.
pub mod admin;
