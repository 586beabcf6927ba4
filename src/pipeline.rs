//! Batch documentation: many artifacts in, one Markdown document per
//! artifact out. A failing artifact never stops the batch.

use crate::error::{Error, Result};
use crate::extract::{extract_functions, script::extract_script};
use crate::model::{DocumentationRecord, Diagnostic};
use crate::render::{MarkdownRenderer, RenderOptions};
use crate::session::{ArtifactRef, Session};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    pub render: RenderOptions,
    /// Render a script's functions under it
    pub nested: bool,
    /// Treat scripts like modules: document their functions only
    pub functions_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Script stem or definition name; used for the output file name
    pub name: String,
    pub source_file: String,
    pub markdown: String,
}

#[derive(Debug)]
pub struct Failure {
    pub input: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct Batch {
    pub documents: Vec<RenderedDocument>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<Failure>,
}

impl Batch {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn document_inputs(inputs: &[ArtifactRef], session: &Session, options: &DocumentOptions) -> Batch {
    let renderer = MarkdownRenderer::new(options.render.clone());
    let mut batch = Batch::default();

    for input in inputs {
        let label = input.label(session);
        tracing::debug!(input = %label, "documenting");
        match document_one(input, session, options, &renderer, &mut batch.diagnostics) {
            Ok(Some(doc)) => batch.documents.push(doc),
            Ok(None) => tracing::debug!(input = %label, "nothing to document"),
            Err(error) => batch.failures.push(Failure { input: label, error }),
        }
    }
    batch
}

fn document_one(
    input: &ArtifactRef,
    session: &Session,
    options: &DocumentOptions,
    renderer: &MarkdownRenderer,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<RenderedDocument>> {
    if let ArtifactRef::FilePath(path) = input {
        if !options.functions_only && is_script(path) {
            return document_script(input, path, session, options, renderer, diagnostics);
        }
    }

    let extracted = extract_functions(input, session)?;
    diagnostics.extend(extracted.diagnostics);
    let records = extracted.value;
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let name = match input {
        ArtifactRef::FilePath(path) => file_stem(path),
        _ => first.name.clone(),
    };
    Ok(Some(RenderedDocument {
        name,
        source_file: first.source_file.clone(),
        markdown: records
            .iter()
            .map(|r| renderer.render(r))
            .collect::<Vec<_>>()
            .join("\n"),
    }))
}

fn document_script(
    input: &ArtifactRef,
    path: &Path,
    session: &Session,
    options: &DocumentOptions,
    renderer: &MarkdownRenderer,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<RenderedDocument>> {
    let extracted = extract_script(path)?;
    diagnostics.extend(extracted.diagnostics);
    let Some(script) = extracted.value else {
        return Ok(None);
    };

    let functions: Vec<DocumentationRecord> = if options.nested {
        let extracted = extract_functions(input, session)?;
        diagnostics.extend(extracted.diagnostics);
        extracted.value
    } else {
        Vec::new()
    };

    let markdown = if options.nested {
        renderer.render_with_nested(&script, &functions)
    } else {
        renderer.render(&script)
    };
    Ok(Some(RenderedDocument {
        name: script.name.clone(),
        source_file: script.source_file.clone(),
        markdown,
    }))
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ps1"))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiagnosticKind;
    use std::fs;
    use std::path::PathBuf;

    fn documented(name: &str) -> String {
        format!("<#\n.SYNOPSIS\n  Does {name}.\n#>\nfunction Invoke-{name} {{\n  param([string]$Path)\n}}\n")
    }

    fn write(dir: &Path, name: &str, text: &str) -> ArtifactRef {
        let path: PathBuf = dir.join(name);
        fs::write(&path, text).unwrap();
        ArtifactRef::FilePath(path)
    }

    #[test]
    fn malformed_artifact_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            write(dir.path(), "one.psm1", &documented("One")),
            write(
                dir.path(),
                "two.psm1",
                "function Invoke-Two {\n<#\n.SYNOPSIS\n  <# nested #>\n#>\nparam()\n}\n",
            ),
            write(dir.path(), "three.psm1", &documented("Three")),
        ];
        let batch = document_inputs(&inputs, &Session::new(), &DocumentOptions::default());

        let names: Vec<&str> = batch.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["one", "three"]);
        assert!(batch.documents[0].markdown.contains("# Invoke-One"));
        let failures: Vec<_> = batch
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::ResolutionFailure)
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].file, "two.psm1");
        assert!(batch.is_success());
    }

    #[test]
    fn missing_input_is_a_failure() {
        let session = Session::new();
        let inputs = vec![ArtifactRef::DefinitionName("Get-Nothing".to_string())];
        let batch = document_inputs(&inputs, &session, &DocumentOptions::default());
        assert!(batch.documents.is_empty());
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].input, "Get-Nothing");
    }

    #[test]
    fn script_with_nested_functions() {
        let dir = tempfile::tempdir().unwrap();
        let script = "<#\n.SYNOPSIS\n  Builds.\n#>\nparam([string]$Out)\n\n\n<#\n.SYNOPSIS\n  Helps.\n#>\nfunction Get-Helper { }\n";
        let input = write(dir.path(), "Build.ps1", script);
        let options = DocumentOptions {
            nested: true,
            ..Default::default()
        };
        let batch = document_inputs(&[input], &Session::new(), &options);
        let doc = &batch.documents[0];
        assert_eq!(doc.name, "Build");
        assert!(doc.markdown.starts_with("# Build\n"));
        assert!(doc.markdown.contains("## Functions\n\n### Get-Helper"));
    }

    #[test]
    fn functions_only_skips_script_help() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "Tools.ps1",
            "<#\n.SYNOPSIS\n  Tool script.\n#>\nparam()\n\n\nfunction Get-A { }\nfunction Get-B { }\n",
        );
        let options = DocumentOptions {
            functions_only: true,
            ..Default::default()
        };
        let batch = document_inputs(&[input], &Session::new(), &options);
        let doc = &batch.documents[0];
        assert_eq!(doc.name, "Tools");
        assert!(doc.markdown.contains("# Get-A\n"));
        assert!(doc.markdown.contains("# Get-B\n"));
        assert!(!doc.markdown.contains("Tool script."));
    }
}
