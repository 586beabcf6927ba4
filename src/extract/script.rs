//! Script-level documentation: a whole `.ps1` file as one record.

use super::{build_record, FieldLog};
use crate::error::{Error, Result};
use crate::model::*;
use crate::parser::ast::{self, Ast};
use crate::parser::{help, syntax};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static RE_INFO_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:blank:]]*\.([A-Za-z]+)\b[[:blank:]]*(.*?)[[:space:]]*$").unwrap());
static RE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+){1,3}$").unwrap());
static RE_GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{?[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}\}?$").unwrap()
});

/// Extract the script-level record of a `.ps1` file.
///
/// Other extensions produce no record and an `UnsupportedArtifact`
/// diagnostic. Only unreadable files are errors.
pub fn extract_script(path: &Path) -> Result<Extracted<Option<DocumentationRecord>>> {
    let source_file = path.to_string_lossy().to_string();
    let is_script = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ps1"));
    if !is_script {
        return Ok(Extracted {
            value: None,
            diagnostics: vec![Diagnostic {
                kind: DiagnosticKind::UnsupportedArtifact,
                file: short_name(&source_file).to_string(),
                definition: None,
                message: "only .ps1 scripts carry script-level help".to_string(),
            }],
        });
    }
    if !path.exists() {
        return Err(Error::PathResolution(source_file));
    }
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(script_from_source(&source_file, &text))
}

/// [`extract_script`] over text that is already in memory.
pub fn script_from_source(source_file: &str, text: &str) -> Extracted<Option<DocumentationRecord>> {
    let tree = ast::parse(text);
    let file = short_name(source_file);
    let name = file
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file);
    let mut out = Extracted::default();

    let script_info = match read_script_info(&tree) {
        Ok(info) => Some(info),
        Err(message) => {
            out.diagnostics.push(Diagnostic {
                kind: DiagnosticKind::ScriptInfo,
                file: file.to_string(),
                definition: None,
                message,
            });
            None
        }
    };

    let help = match help::resolve_script(&tree, file) {
        Ok(help) => help,
        Err(e) => {
            tracing::debug!(file, error = %e, "script help resolution failed");
            out.diagnostics.push(Diagnostic {
                kind: DiagnosticKind::ResolutionFailure,
                file: file.to_string(),
                definition: None,
                message: format!("skipped: {}", e),
            });
            return out;
        }
    };

    let mut log = FieldLog::new(file, None);
    let syntax = match help::signature(&tree.source, &tree.script().parts) {
        Ok(sig) => syntax::normalize(&syntax::introspect(file, &sig)),
        Err(_) => {
            log.missing(Field::Syntax, "could not derive syntax; using the file name");
            file.to_string()
        }
    };
    let record = build_record(&mut log, name, source_file, syntax, help, script_info);
    out.diagnostics.extend(log.into_diagnostics());
    out.value = Some(record);
    out
}

/// Parse the `<#PSScriptInfo ... #>` block.
fn read_script_info(tree: &Ast) -> std::result::Result<ScriptInfo, String> {
    let span = tree
        .script()
        .script_info
        .ok_or_else(|| "no PSScriptInfo block".to_string())?;
    let raw = span.text(&tree.source);
    let body = raw
        .get("<#PSScriptInfo".len()..)
        .unwrap_or("")
        .trim_end_matches("#>");

    let mut entries: Vec<(String, Vec<String>)> = Vec::new();
    for line in body.lines() {
        if let Some(caps) = RE_INFO_KEY.captures(line) {
            let first = caps[2].to_string();
            entries.push((caps[1].to_ascii_uppercase(), vec![first]));
        } else if let Some((_, lines)) = entries.last_mut() {
            lines.push(line.trim().to_string());
        }
    }

    let value = |key: &str| -> Option<String> {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, lines)| lines.join("\n").trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let version = value("VERSION").ok_or_else(|| "PSScriptInfo has no .VERSION".to_string())?;
    if !RE_VERSION.is_match(&version) {
        return Err(format!("invalid .VERSION '{}'", version));
    }
    let guid = value("GUID").ok_or_else(|| "PSScriptInfo has no .GUID".to_string())?;
    if !RE_GUID.is_match(&guid) {
        return Err(format!("invalid .GUID '{}'", guid));
    }

    Ok(ScriptInfo {
        version,
        guid: Some(guid),
        author: value("AUTHOR"),
        company_name: value("COMPANYNAME"),
        copyright: value("COPYRIGHT"),
        tags: value("TAGS")
            .map(|t| {
                t.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        release_notes: value("RELEASENOTES"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"<#PSScriptInfo
.VERSION 1.2.0
.GUID 6f1b4a8e-2c3d-4e5f-8a9b-0c1d2e3f4a5b
.AUTHOR ops
.TAGS deploy, build
.RELEASENOTES
  First line.
  Second line.
#>

<#
.SYNOPSIS
    Deploys the site.
.DESCRIPTION
    Copies the build output to the target.
.PARAMETER Target
    Destination folder.
#>
[CmdletBinding()]
param(
    [Parameter(Mandatory)]
    [string]$Target
)

function Copy-Output {
    param($From)
}
"#;

    #[test]
    fn script_record_uses_file_stem() {
        let out = script_from_source("tools/Deploy.ps1", SCRIPT);
        let record = out.value.unwrap();
        assert_eq!(record.name, "Deploy");
        assert_eq!(record.file_name(), "Deploy.ps1");
        assert_eq!(record.synopsis, "Deploys the site.");
        assert_eq!(record.description, "Copies the build output to the target.");
        assert_eq!(record.syntax, "Deploy.ps1 [-Target] <string> [<CommonParameters>]");
        assert_eq!(record.parameters[0].description, "Destination folder.");
    }

    #[test]
    fn script_info_is_read() {
        let out = script_from_source("Deploy.ps1", SCRIPT);
        let info = out.value.unwrap().script_info.unwrap();
        assert_eq!(info.version, "1.2.0");
        assert_eq!(info.author.as_deref(), Some("ops"));
        assert_eq!(info.tags, vec!["deploy".to_string(), "build".to_string()]);
        assert_eq!(info.release_notes.as_deref(), Some("First line.\nSecond line."));
        assert!(out
            .diagnostics
            .iter()
            .all(|d| d.kind != DiagnosticKind::ScriptInfo));
    }

    #[test]
    fn invalid_version_is_a_diagnostic() {
        let src = SCRIPT.replace(".VERSION 1.2.0", ".VERSION latest");
        let out = script_from_source("Deploy.ps1", &src);
        let record = out.value.unwrap();
        assert!(record.script_info.is_none());
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ScriptInfo && d.message.contains("latest")));
    }

    #[test]
    fn missing_help_still_yields_record() {
        let out = script_from_source("bare.ps1", "param([string]$Path)\nGet-Item $Path\n");
        let record = out.value.unwrap();
        assert_eq!(record.synopsis, "");
        assert_eq!(record.syntax, "bare.ps1 [[-Path] <string>]");
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::MissingField(Field::Synopsis)));
    }

    #[test]
    fn module_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Tools.psm1");
        fs::write(&path, "function X { }").unwrap();
        let out = extract_script(&path).unwrap();
        assert!(out.value.is_none());
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnsupportedArtifact);
        assert_eq!(out.diagnostics[0].file, "Tools.psm1");
    }

    #[test]
    fn missing_script_is_an_error() {
        let err = extract_script(Path::new("/no/such/file.ps1")).unwrap_err();
        assert!(matches!(err, Error::PathResolution(_)));
    }

    #[test]
    fn nested_help_drops_script_record() {
        let src = "<#\n.SYNOPSIS\n  bad <# x #>\n#>\nparam()\n";
        let out = script_from_source("bad.ps1", src);
        assert!(out.value.is_none());
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ResolutionFailure));
    }
}
