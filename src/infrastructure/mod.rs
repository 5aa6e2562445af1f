//! Infrastructure layer: document files on disk
//!
//! This layer turns files into trees and back.

pub mod document;
pub mod error;

pub use document::{parse_document, read_document, to_json, write_document, DocumentNode};
pub use error::{InfraError, InfraResult};
