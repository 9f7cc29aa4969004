//! Privacy Filter Client (component D): removes PII from extracted text
//! while preserving medical terminology, falling back to a local
//! regex-only filter when the remote service is unreachable.

pub mod client;
pub mod error;
pub mod local;
pub mod placeholders;

pub use client::{PiiRemovalResult, PrivacyFilterClient, PrivacyFilterConfig};
pub use error::PrivacyError;
pub use local::remove_pii_local;
pub use placeholders::PLACEHOLDERS;
