//! Comment-based help: keyword sections and the structured help object
//! resolved from a definition.

use super::ast::{self, Ast, DefinitionParts};
use super::params::{self, ParamError, Signature};
use super::syntax;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static RE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^[[:blank:]]*\.(SYNOPSIS|DESCRIPTION|PARAMETER|EXAMPLE|INPUTS|OUTPUTS|NOTES|LINK",
        r"|COMPONENT|ROLE|FUNCTIONALITY|FORWARDHELPTARGETNAME|FORWARDHELPCATEGORY",
        r"|REMOTEHELPRUNSPACE|EXTERNALHELP)\b[[:blank:]]*(.*?)[[:space:]]*$"
    ))
    .unwrap()
});

/// Title the help system gives the n-th example (1-based).
pub fn example_title(n: usize) -> String {
    format!("-------------------------- EXAMPLE {} --------------------------", n)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no function definition found in the help unit")]
    NoDefinition,
    #[error("comment block contains nested comment delimiters")]
    NestedComment,
    #[error(transparent)]
    Parameter(#[from] ParamError),
}

/// True when the comment text contains at least one help keyword line.
pub fn is_help(text: &str) -> bool {
    text.lines().any(|l| RE_KEYWORD.is_match(l))
}

/// Raw keyword sections of a help comment.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HelpSections {
    pub synopsis: Option<String>,
    pub description: Option<String>,
    /// (name, text) per `.PARAMETER`
    pub parameters: Vec<(String, String)>,
    pub examples: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub notes: Option<String>,
    pub links: Vec<String>,
}

/// Split a help comment into its keyword sections. Text before the first
/// keyword and unknown keywords are ignored; single-valued sections keep
/// their first non-empty occurrence.
pub fn parse_sections(text: &str) -> HelpSections {
    let mut raw: Vec<(String, String, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = RE_KEYWORD.captures(line) {
            raw.push((caps[1].to_ascii_uppercase(), caps[2].to_string(), Vec::new()));
        } else if let Some(current) = raw.last_mut() {
            current.2.push(line);
        }
    }

    let mut sections = HelpSections::default();
    for (keyword, arg, lines) in raw {
        let body = section_text(&lines);
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        match keyword.as_str() {
            "SYNOPSIS" => {
                if sections.synopsis.is_none() {
                    sections.synopsis = non_empty(body);
                }
            }
            "DESCRIPTION" => {
                if sections.description.is_none() {
                    sections.description = non_empty(body);
                }
            }
            "NOTES" => {
                if sections.notes.is_none() {
                    sections.notes = non_empty(body);
                }
            }
            "PARAMETER" if !arg.is_empty() => sections.parameters.push((arg, body)),
            "EXAMPLE" => sections.examples.push(body),
            "INPUTS" => sections.inputs.extend(non_empty(body)),
            "OUTPUTS" => sections.outputs.extend(non_empty(body)),
            "LINK" => {
                let link = if arg.is_empty() { body } else { arg };
                sections.links.extend(non_empty(link));
            }
            _ => {}
        }
    }
    sections
}

/// Unindent section lines and trim blank lines at both ends.
fn section_text(lines: &[&str]) -> String {
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(min_indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Code is the text up to the first blank line, remarks the rest.
fn split_example(text: &str) -> (String, String) {
    let lines: Vec<&str> = text.lines().collect();
    let split = lines
        .iter()
        .position(|l| l.trim().is_empty())
        .unwrap_or(lines.len());
    let code = lines[..split].join("\n");
    let remarks = lines[split..].join("\n").trim().to_string();
    (code, remarks)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpParameter {
    pub name: String,
    pub description: Option<String>,
    pub type_name: String,
    pub default_value: String,
    pub required: bool,
    pub position: Option<u32>,
    pub pipeline_input: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpExample {
    pub title: String,
    pub code: String,
    pub remarks: String,
}

/// Structured help object for one definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpInfo {
    /// Falls back to the generated syntax when `.SYNOPSIS` is absent
    pub synopsis: String,
    pub description: Option<String>,
    pub parameters: Vec<HelpParameter>,
    pub examples: Vec<HelpExample>,
    /// `.NOTES` text
    pub alerts: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub links: Vec<String>,
}

/// Resolve help for the single function defined in `unit`.
pub fn resolve(unit: &str) -> Result<HelpInfo, ResolveError> {
    let ast = ast::parse(unit);
    let node = ast.functions().into_iter().next().ok_or(ResolveError::NoDefinition)?;
    let func = node.function().ok_or(ResolveError::NoDefinition)?;
    resolve_parts(&ast, &func.name, &func.parts)
}

/// Resolve help for a whole script, shown under `command`.
pub fn resolve_script(ast: &Ast, command: &str) -> Result<HelpInfo, ResolveError> {
    resolve_parts(ast, command, &ast.script().parts)
}

/// Signature of a definition's parameter list.
pub fn signature(src: &str, parts: &DefinitionParts) -> Result<Signature, ParamError> {
    params::parse_signature(
        parts.attributes.map(|s| s.text(src)),
        parts.param_list.map(|s| s.text(src)),
    )
}

fn resolve_parts(ast: &Ast, command: &str, parts: &DefinitionParts) -> Result<HelpInfo, ResolveError> {
    let src = ast.source.as_str();
    let text = match parts.help {
        Some(ref block) => {
            let body = block.body(src);
            if body.contains("<#") {
                return Err(ResolveError::NestedComment);
            }
            body
        }
        None => String::new(),
    };
    let sig = signature(src, parts)?;
    let sections = parse_sections(&text);
    let positions = syntax::positions(&sig);

    let parameters = sig
        .params
        .iter()
        .zip(positions)
        .map(|(decl, position)| {
            let documented = sections
                .parameters
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&decl.name))
                .map(|(_, text)| text.clone())
                .filter(|t| !t.is_empty());
            HelpParameter {
                name: decl.name.clone(),
                description: documented.or_else(|| decl.comment.clone()),
                type_name: decl.display_type().to_string(),
                default_value: decl.default_value.clone().unwrap_or_default(),
                required: decl.mandatory(),
                position,
                pipeline_input: decl.pipeline_input(),
            }
        })
        .collect();

    let examples = sections
        .examples
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let (code, remarks) = split_example(text);
            HelpExample {
                title: example_title(i + 1),
                code,
                remarks,
            }
        })
        .collect();

    let synopsis = sections
        .synopsis
        .unwrap_or_else(|| syntax::normalize(&syntax::introspect(command, &sig)));

    Ok(HelpInfo {
        synopsis,
        description: sections.description,
        parameters,
        examples,
        alerts: sections.notes.into_iter().collect(),
        inputs: sections.inputs,
        outputs: sections.outputs,
        links: sections.links,
    })
}
