//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Redis connection for rate limiting
//! - Prometheus metrics
//! - Avatar file storage and OTP delivery

pub mod cache;
pub mod database;
pub mod metrics;
pub mod notifications;
pub mod repositories;
pub mod storage;
