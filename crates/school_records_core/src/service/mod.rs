//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Run the report save rules as explicit steps instead of save hooks.

pub mod history_service;
pub mod notification_service;
pub mod report_cascade;
pub mod report_service;
