//! Data model for extracted documentation — format-agnostic.

use std::fmt;

/// Normalized help metadata for one function or one script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentationRecord {
    /// Function name, or the script's file stem
    pub name: String,
    /// Path of the artifact the record was extracted from
    pub source_file: String,
    /// Signature, one line per parameter set
    pub syntax: String,
    pub synopsis: String,
    pub description: String,
    pub parameters: Vec<ParameterRecord>,
    pub examples: Vec<ExampleRecord>,
    pub notes: String,
    /// .INPUTS entries
    pub inputs: Vec<String>,
    /// .OUTPUTS entries
    pub outputs: Vec<String>,
    /// .LINK entries
    pub links: Vec<String>,
    /// <#PSScriptInfo#> metadata (script records only)
    pub script_info: Option<ScriptInfo>,
}

impl DocumentationRecord {
    /// Leaf name of the source file, e.g. "Deploy.ps1".
    pub fn file_name(&self) -> &str {
        short_name(&self.source_file)
    }
}

/// One entry of the parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterRecord {
    pub name: String,
    pub description: String,
    /// Default value expression as written, empty when none
    pub default_value: String,
    pub required: bool,
    /// Declared type name ("Object" when untyped)
    pub parameter_value: String,
    /// `None` for named-only parameters
    pub position: Option<u32>,
    pub pipeline_input: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleRecord {
    pub title: String,
    pub body: String,
}

/// Script-level metadata from a `<#PSScriptInfo ... #>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    pub version: String,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub company_name: Option<String>,
    pub copyright: Option<String>,
    pub tags: Vec<String>,
    pub release_notes: Option<String>,
}

/// Documentation fields that may be missing from a help block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Synopsis,
    Description,
    Parameters,
    ParameterDescription,
    Examples,
    Notes,
    Syntax,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Synopsis => "synopsis",
            Field::Description => "description",
            Field::Parameters => "parameters",
            Field::ParameterDescription => "parameter description",
            Field::Examples => "examples",
            Field::Notes => "notes",
            Field::Syntax => "syntax",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Field absent, fallback value substituted
    MissingField(Field),
    /// Help block could not be resolved, definition dropped
    ResolutionFailure,
    /// File type not handled by the extractor
    UnsupportedArtifact,
    /// <#PSScriptInfo#> block absent or invalid
    ScriptInfo,
}

/// Non-fatal, warning-level finding collected during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Short file name of the artifact
    pub file: String,
    pub definition: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.definition {
            Some(ref def) => write!(f, "{}: {}: {}", self.file, def, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

/// Extraction output with the diagnostics collected along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

/// Leaf component of a path string, accepting both separators.
pub fn short_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_handles_both_separators() {
        assert_eq!(short_name("scripts/Deploy.ps1"), "Deploy.ps1");
        assert_eq!(short_name(r"C:\tools\Tools.psm1"), "Tools.psm1");
        assert_eq!(short_name("Tools.psm1"), "Tools.psm1");
    }

    #[test]
    fn diagnostic_display_includes_definition() {
        let diag = Diagnostic {
            kind: DiagnosticKind::MissingField(Field::Notes),
            file: "Tools.psm1".to_string(),
            definition: Some("Get-Thing".to_string()),
            message: "no notes".to_string(),
        };
        assert_eq!(diag.to_string(), "Tools.psm1: Get-Thing: no notes");
    }
}
