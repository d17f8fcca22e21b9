pub mod diagnostics;
pub mod error;
pub mod parse;
pub mod resolve;
pub mod template;
pub mod topology;
pub mod types;
pub mod wasm;

pub use diagnostics::{Collector, Diagnostic, Scope};
pub use error::{DiagnosticKind, Issue, ValidationError};
pub use parse::{ArchiveHandler, DocumentLoader, DocumentLocation, FsLoader, MemoryLoader};
pub use template::{CapabilityCheck, ParserSettings, TemplateBuilder, TemplateOptions, ToscaTemplate};
