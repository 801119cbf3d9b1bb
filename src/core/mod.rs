pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::{ModelConfig, PipelineConfig};
pub use error::AuditError;
pub use services::{GenerationConfig, Ocr, ReasonRequest, Reasoner, Services, Transcriber};
