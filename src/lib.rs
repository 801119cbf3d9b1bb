pub mod adapters;
pub mod core;
pub mod extract;
pub mod fetch;
pub mod fingerprint;
pub mod http;
pub mod pipeline;
pub mod procutil;
pub mod reason;
pub mod rules;
pub mod store;
pub mod text;

// --- Primary exports ---
pub use crate::core::config::PipelineConfig;
pub use crate::core::error::AuditError;
pub use crate::core::services::{Ocr, Reasoner, Services, Transcriber};
pub use crate::core::types;
pub use crate::core::types::{AuditOptions, AuditRecord, Input, Report, Violation};
pub use crate::pipeline::{AuditOutcome, Pipeline};
pub use crate::rules::RuleRepository;
pub use crate::store::{AuditStore, MemoryStore};
