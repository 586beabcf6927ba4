//! psdoc — Markdown documentation from PowerShell comment-based help.
//!
//! Functions and scripts are parsed into [`DocumentationRecord`]s, which
//! [`MarkdownRenderer`] turns into Markdown at coarse or fine granularity.

pub mod error;
pub mod extract;
pub mod heading;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod session;

pub use error::{Error, Result};
pub use extract::extract_functions;
pub use extract::script::extract_script;
pub use model::{Diagnostic, DiagnosticKind, DocumentationRecord, Extracted};
pub use render::{Granularity, MarkdownRenderer, RenderOptions};
pub use session::{ArtifactRef, Session};
