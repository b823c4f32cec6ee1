//! Contract-compliance scoring for municipal waste-management services.
//!
//! Source exports are parsed into drafts, reconciled idempotently into a
//! record store, and scored through the regulator's indicator tables.

pub mod alerts;
pub mod classification;
pub mod config;
pub mod deadline;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod ingest;
pub mod reconcile;
pub mod remediation;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod telemetry;

pub use router::compliance_router;
pub use service::{ComplianceService, ComplianceServiceError, ImportKind, ImportReport};
