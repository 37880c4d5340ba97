//! # PetCare Server Library
//!
//! Multi-tenant REST API for pet-care businesses:
//! - Accounts, JWT sessions and one-time passcodes
//! - Clients, pets and medical records
//! - Service catalog, staff and business settings
//! - Appointment booking with a server-enforced status workflow
//! - Dashboard counters and revenue summary
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities, value objects and repository traits
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: PostgreSQL, Redis, metrics, file storage
//! - **Presentation Layer**: HTTP handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! petcare_server/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities, value objects, and traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database, cache, storage and metrics
//! +-- presentation/   HTTP routes, handlers and middleware
//! +-- shared/         Common utilities (errors, ids, pagination, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
