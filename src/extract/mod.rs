//! Documentation extraction: syntax tree → documentation records.
//!
//! Each function is re-synthesized as a minimal standalone unit holding only
//! its help comment and parameter list, then resolved through the help
//! resolver. Missing fields never fail extraction; they produce a diagnostic
//! and a fallback value instead.

pub mod script;

use crate::error::Result;
use crate::model::*;
use crate::parser::ast::{self, FunctionData};
use crate::parser::help::{self, HelpInfo};
use crate::parser::syntax;
use crate::session::{ArtifactRef, Session};
use regex::RegexBuilder;

/// Extract one record per documented function in the artifact, in source
/// order. Class methods are skipped; so are definitions whose help block
/// cannot be resolved (reported as diagnostics).
pub fn extract_functions(
    artifact: &ArtifactRef,
    session: &Session,
) -> Result<Extracted<Vec<DocumentationRecord>>> {
    let resolved = artifact.resolve(session)?;
    Ok(functions_from_source(&resolved.source_file, &resolved.text))
}

/// [`extract_functions`] over text that is already in memory.
pub fn functions_from_source(source_file: &str, text: &str) -> Extracted<Vec<DocumentationRecord>> {
    let tree = ast::parse(text);
    let file = short_name(source_file);
    let mut out: Extracted<Vec<DocumentationRecord>> = Extracted::default();

    for node in tree.functions() {
        let Some(func) = node.function() else {
            continue;
        };
        let unit = synthesize(&tree.source, func);
        let help = match help::resolve(&unit) {
            Ok(help) => help,
            Err(e) => {
                tracing::debug!(file, function = %func.name, error = %e, "help resolution failed");
                out.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::ResolutionFailure,
                    file: file.to_string(),
                    definition: Some(func.name.clone()),
                    message: format!("skipped: {}", e),
                });
                continue;
            }
        };

        let mut log = FieldLog::new(file, Some(&func.name));
        let syntax = unit_syntax(&unit, &func.name, &mut log);
        let record = build_record(&mut log, &func.name, source_file, syntax, help, None);
        out.diagnostics.extend(log.into_diagnostics());
        out.value.push(record);
    }

    tracing::debug!(file, records = out.value.len(), "extracted functions");
    out
}

/// Standalone unit: help comment and parameter list under the original name.
fn synthesize(src: &str, func: &FunctionData) -> String {
    let help = func.parts.help.as_ref().map(|h| h.span.text(src)).unwrap_or("");
    let attributes = func.parts.attributes.map(|s| s.text(src)).unwrap_or("");
    let params = func
        .parts
        .param_list
        .map(|s| format!("param({})", s.text(src)))
        .unwrap_or_default();
    format!("function {} {{\n{}\n{}\n{}\n}}", func.name, help, attributes, params)
}

/// Signature introspection of a re-synthesized unit.
fn unit_syntax(unit: &str, name: &str, log: &mut FieldLog) -> String {
    let tree = ast::parse(unit);
    let parts = tree.functions().into_iter().find_map(|n| n.function()).map(|f| &f.parts);
    let sig = parts.map(|p| help::signature(&tree.source, p));
    match sig {
        Some(Ok(sig)) => syntax::normalize(&syntax::introspect(name, &sig)),
        _ => {
            log.missing(Field::Syntax, "could not derive syntax; using the bare name");
            name.to_string()
        }
    }
}

/// Collects per-field diagnostics while a record is built.
pub(crate) struct FieldLog<'a> {
    file: &'a str,
    definition: Option<&'a str>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> FieldLog<'a> {
    pub(crate) fn new(file: &'a str, definition: Option<&'a str>) -> Self {
        FieldLog {
            file,
            definition,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn missing(&mut self, field: Field, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            kind: DiagnosticKind::MissingField(field),
            file: self.file.to_string(),
            definition: self.definition.map(str::to_string),
            message: message.into(),
        });
    }

    /// The value when present and non-blank, otherwise the fallback plus a
    /// diagnostic.
    pub(crate) fn text(
        &mut self,
        field: Field,
        value: Option<String>,
        fallback: impl FnOnce() -> String,
    ) -> String {
        match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                self.missing(field, format!("no {} found", field));
                fallback()
            }
        }
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// True when the synopsis is just the generated syntax restated. Only `[`
/// and `]` are escaped before matching, which ignores case.
pub(crate) fn restates_syntax(synopsis: &str, syntax: &str) -> bool {
    if syntax.is_empty() {
        return false;
    }
    let escaped = syntax.replace('[', r"\[").replace(']', r"\]");
    match RegexBuilder::new(&escaped).case_insensitive(true).build() {
        Ok(re) => re.is_match(synopsis),
        Err(_) => synopsis.to_lowercase().contains(&syntax.to_lowercase()),
    }
}

/// Normalize a resolved help object into a record, applying fallbacks.
pub(crate) fn build_record(
    log: &mut FieldLog,
    name: &str,
    source_file: &str,
    syntax: String,
    help: HelpInfo,
    script_info: Option<ScriptInfo>,
) -> DocumentationRecord {
    let synopsis = if restates_syntax(&help.synopsis, &syntax) {
        log.missing(Field::Synopsis, "synopsis only restates the syntax; left blank");
        String::new()
    } else {
        log.text(Field::Synopsis, Some(help.synopsis), String::new)
    };

    let description = log.text(Field::Description, help.description, || synopsis.clone());

    if help.parameters.is_empty() {
        log.missing(Field::Parameters, "no parameters found");
    }
    let parameters = help
        .parameters
        .into_iter()
        .map(|p| {
            let description = match p.description {
                Some(d) if !d.trim().is_empty() => d.trim().to_string(),
                _ => {
                    log.missing(
                        Field::ParameterDescription,
                        format!("no description for parameter {}", p.name),
                    );
                    String::new()
                }
            };
            ParameterRecord {
                name: p.name,
                description,
                default_value: p.default_value,
                required: p.required,
                parameter_value: p.type_name,
                position: p.position,
                pipeline_input: p.pipeline_input,
            }
        })
        .collect();

    if help.examples.is_empty() {
        log.missing(Field::Examples, "no examples found");
    }
    let examples = help
        .examples
        .into_iter()
        .map(|e| ExampleRecord {
            title: e.title.trim_matches('-').trim().to_string(),
            body: if e.remarks.trim().is_empty() {
                e.code
            } else {
                format!("{}\n{}", e.code, e.remarks)
            },
        })
        .collect();

    let notes = log.text(Field::Notes, Some(help.alerts.join("\n\n")), String::new);

    DocumentationRecord {
        name: name.to_string(),
        source_file: source_file.to_string(),
        syntax,
        synopsis,
        description,
        parameters,
        examples,
        notes,
        inputs: help.inputs,
        outputs: help.outputs,
        links: help.links,
        script_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"
<#
.SYNOPSIS
    Gets a widget.
.PARAMETER Name
    Widget name.
.EXAMPLE
    Get-Widget -Name a

    Gets widget a.
.NOTES
    Internal use.
#>
function Get-Widget {
    [CmdletBinding()]
    param(
        [Parameter(Mandatory, Position = 0)]
        [string]$Name
    )
    "widget $Name"
}

function Test-Function {
    param([Parameter(Mandatory, Position = 0)][String]$Parameter)
}

function Broken {
    <#
    .SYNOPSIS
        Has <# nested #> delimiters.
    #>
    param()
}

class Tool {
    [void] Run() { }
}
"#;

    fn extract() -> Extracted<Vec<DocumentationRecord>> {
        functions_from_source("src/Widgets.psm1", MODULE)
    }

    #[test]
    fn extracts_documented_function() {
        let out = extract();
        let widget = &out.value[0];
        assert_eq!(widget.name, "Get-Widget");
        assert_eq!(widget.source_file, "src/Widgets.psm1");
        assert_eq!(
            widget.syntax,
            "Get-Widget [-Name] <string> [<CommonParameters>]"
        );
        assert_eq!(widget.synopsis, "Gets a widget.");
        assert_eq!(widget.parameters[0].description, "Widget name.");
        assert!(widget.parameters[0].required);
        assert_eq!(widget.examples[0].title, "EXAMPLE 1");
        assert_eq!(widget.examples[0].body, "Get-Widget -Name a\nGets widget a.");
        assert_eq!(widget.notes, "Internal use.");
    }

    #[test]
    fn description_falls_back_to_synopsis() {
        let out = extract();
        let widget = &out.value[0];
        assert_eq!(widget.description, widget.synopsis);
        assert!(out.diagnostics.iter().any(|d| {
            d.kind == DiagnosticKind::MissingField(Field::Description)
                && d.definition.as_deref() == Some("Get-Widget")
        }));
    }

    #[test]
    fn synopsis_restating_syntax_is_blanked() {
        let out = extract();
        let test_fn = out.value.iter().find(|r| r.name == "Test-Function").unwrap();
        assert_eq!(test_fn.syntax, "Test-Function [-Parameter] <String> [<CommonParameters>]");
        assert_eq!(test_fn.synopsis, "");
        assert_eq!(test_fn.description, "");
        assert!(test_fn.examples.is_empty());
    }

    #[test]
    fn malformed_help_drops_only_that_definition() {
        let out = extract();
        let names: Vec<&str> = out.value.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Get-Widget", "Test-Function"]);
        let failure = out
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::ResolutionFailure)
            .unwrap();
        assert_eq!(failure.file, "Widgets.psm1");
        assert_eq!(failure.definition.as_deref(), Some("Broken"));
    }

    #[test]
    fn class_methods_are_not_records() {
        let out = extract();
        assert!(out.value.iter().all(|r| r.name != "Run"));
    }

    #[test]
    fn empty_source_yields_no_records() {
        let out = functions_from_source("empty.ps1", "Write-Output 'hi'\n");
        assert!(out.value.is_empty());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn restates_syntax_uses_bracket_escaping() {
        let syntax = "Test-Function [-Parameter] <String>";
        assert!(restates_syntax("Usage: Test-Function [-Parameter] <String>", syntax));
        assert!(!restates_syntax("Tests things.", syntax));
        assert!(!restates_syntax("anything", ""));
    }

    #[test]
    fn restates_syntax_ignores_case() {
        assert!(restates_syntax(
            "test-function [-parameter] <string>",
            "Test-Function [-Parameter] <String>"
        ));
    }

    #[test]
    fn extract_functions_through_session() {
        let mut session = Session::new();
        session.load("Widgets.psm1", MODULE);
        let artifact = ArtifactRef::from_input("Get-Widget", &session);
        let out = extract_functions(&artifact, &session).unwrap();
        assert_eq!(out.value.len(), 1);
        assert_eq!(out.value[0].synopsis, "Gets a widget.");
    }
}
