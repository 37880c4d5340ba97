//! # Domain Services
//!
//! Business rules that do not belong to a single entity.
//!
//! ## Services
//!
//! - **AccessPolicy**: tenant, role and ownership checks
//! - **calendar**: month bounds and per-day grouping of appointments

mod access_policy;
pub mod calendar;

pub use access_policy::*;
