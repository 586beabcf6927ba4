//! Reader for `param(...)` lists and the attributes in front of them.

use super::lexer::{tokenize, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("parameter declaration without a variable: '{0}'")]
    MissingVariable(String),
    #[error("unbalanced brackets in parameter list")]
    Unbalanced,
}

/// `[Name(args)]` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<AttributeArg>,
}

/// One attribute argument: `Key = value`, a bare `Key`, or a positional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeArg {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl Attribute {
    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .name
                .strip_suffix("Attribute")
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    fn arg(&self, key: &str) -> Option<&AttributeArg> {
        self.args
            .iter()
            .find(|a| a.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case(key)))
    }

    /// Named flag: a bare key counts as `$true`.
    fn flag(&self, key: &str) -> bool {
        match self.arg(key) {
            Some(arg) => arg.value.as_deref().map(is_truthy).unwrap_or(true),
            None => false,
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.arg(key)
            .and_then(|a| a.value.as_deref())
            .map(unquote)
    }
}

/// Settings from one `[Parameter(...)]` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterAttr {
    /// `None` means all parameter sets
    pub set: Option<String>,
    pub mandatory: bool,
    pub position: Option<u32>,
    pub from_pipeline: bool,
    pub from_pipeline_by_name: bool,
}

/// A declared parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    /// Type constraint as written, without the brackets
    pub type_name: Option<String>,
    pub default_value: Option<String>,
    /// One entry per `[Parameter()]` attribute; empty when there is none
    pub parameter_attrs: Vec<ParameterAttr>,
    /// Comment directly above the declaration
    pub comment: Option<String>,
}

impl ParamDecl {
    pub fn is_switch(&self) -> bool {
        self.type_name.as_deref().is_some_and(|t| {
            t.eq_ignore_ascii_case("switch")
                || t.eq_ignore_ascii_case("System.Management.Automation.SwitchParameter")
        })
    }

    pub fn mandatory(&self) -> bool {
        self.parameter_attrs.iter().any(|a| a.mandatory)
    }

    pub fn declared_position(&self) -> Option<u32> {
        self.parameter_attrs.iter().find_map(|a| a.position)
    }

    pub fn pipeline_input(&self) -> bool {
        self.parameter_attrs
            .iter()
            .any(|a| a.from_pipeline || a.from_pipeline_by_name)
    }

    /// Settings that apply in `set`, if the parameter belongs to it.
    pub fn in_set(&self, set: Option<&str>) -> Option<ParameterAttr> {
        if self.parameter_attrs.is_empty() {
            return Some(ParameterAttr::default());
        }
        let named = set.and_then(|s| {
            self.parameter_attrs
                .iter()
                .find(|a| a.set.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(s)))
        });
        named
            .or_else(|| self.parameter_attrs.iter().find(|a| a.set.is_none()))
            .cloned()
    }

    /// Type shown in syntax lines and parameter tables.
    pub fn display_type(&self) -> &str {
        self.type_name.as_deref().unwrap_or("Object")
    }
}

/// Function-level binding behaviour from `[CmdletBinding()]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub advanced: bool,
    pub default_set: Option<String>,
    pub positional_binding: bool,
}

impl Default for Binding {
    fn default() -> Self {
        Binding {
            advanced: false,
            default_set: None,
            positional_binding: true,
        }
    }
}

/// Parsed parameter declarations plus binding settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub binding: Binding,
    pub params: Vec<ParamDecl>,
}

/// Read the attribute text in front of `param` and the parameter list.
pub fn parse_signature(
    attributes: Option<&str>,
    param_list: Option<&str>,
) -> Result<Signature, ParamError> {
    let mut binding = Binding::default();
    if let Some(text) = attributes {
        let tokens = tokenize(text);
        let (items, _) = read_attributes(text, &tokens, 0)?;
        let cmdlet = items.iter().find_map(|item| match item {
            Bracketed::Attr(attr) if attr.is("CmdletBinding") => Some(attr),
            _ => None,
        });
        if let Some(cmdlet) = cmdlet {
            binding.advanced = true;
            binding.default_set = cmdlet.string("DefaultParameterSetName");
            if cmdlet.arg("PositionalBinding").is_some() {
                binding.positional_binding = cmdlet.flag("PositionalBinding");
            }
        }
    }

    let params = match param_list {
        Some(text) => parse_param_list(text)?,
        None => Vec::new(),
    };
    if params.iter().any(|p| !p.parameter_attrs.is_empty()) {
        binding.advanced = true;
    }

    Ok(Signature { binding, params })
}

/// Split a parameter list at top-level commas and read each declaration.
pub fn parse_param_list(text: &str) -> Result<Vec<ParamDecl>, ParamError> {
    let tokens = tokenize(text);
    let mut params = Vec::new();
    for piece in split_top_level(&tokens)? {
        if let Some(decl) = parse_decl(text, piece)? {
            params.push(decl);
        }
    }
    Ok(params)
}

fn split_top_level(tokens: &[Token]) -> Result<Vec<&[Token]>, ParamError> {
    let mut pieces = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParamError::Unbalanced);
                }
            }
            TokenKind::Comma if depth == 0 => {
                pieces.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParamError::Unbalanced);
    }
    pieces.push(&tokens[start..]);
    Ok(pieces)
}

fn parse_decl(src: &str, tokens: &[Token]) -> Result<Option<ParamDecl>, ParamError> {
    let mut i = 0;
    let mut comments = Vec::new();
    while i < tokens.len() && (tokens[i].kind == TokenKind::Newline || tokens[i].is_comment()) {
        if tokens[i].is_comment() {
            comments.push(comment_text(tokens[i].text(src)));
        }
        i += 1;
    }
    if i == tokens.len() {
        return Ok(None);
    }

    let mut decl = ParamDecl::default();
    let comment = comments.join("\n").trim().to_string();
    if !comment.is_empty() {
        decl.comment = Some(comment);
    }

    let (items, next) = read_attributes(src, tokens, i)?;
    i = next;
    for item in items {
        match item {
            Bracketed::Type(name) => decl.type_name = Some(name),
            Bracketed::Attr(attr) if attr.is("Parameter") => {
                decl.parameter_attrs.push(parameter_attr(&attr))
            }
            Bracketed::Attr(_) => {}
        }
    }

    let var = tokens
        .get(i)
        .filter(|t| t.kind == TokenKind::Variable)
        .ok_or_else(|| ParamError::MissingVariable(piece_text(src, tokens)))?;
    decl.name = variable_name(var.text(src)).to_string();
    i += 1;

    if tokens.get(i).map(|t| t.kind) == Some(TokenKind::Equals) {
        let value_tokens: Vec<&Token> = tokens[i + 1..]
            .iter()
            .filter(|t| !t.is_comment() && t.kind != TokenKind::Newline)
            .collect();
        if let (Some(first), Some(last)) = (value_tokens.first(), value_tokens.last()) {
            decl.default_value = Some(src[first.start..last.end].trim().to_string());
        }
    }

    Ok(Some(decl))
}

/// Bracketed item in front of a declaration.
enum Bracketed {
    Type(String),
    Attr(Attribute),
}

/// Read consecutive `[...]` groups starting at `i`.
fn read_attributes(
    src: &str,
    tokens: &[Token],
    mut i: usize,
) -> Result<(Vec<Bracketed>, usize), ParamError> {
    let mut out = Vec::new();
    while i < tokens.len() && tokens[i].kind == TokenKind::LBracket {
        let close = matching(tokens, i).ok_or(ParamError::Unbalanced)?;
        let inner = &tokens[i + 1..close];
        let is_attr = inner.len() >= 2
            && inner[0].kind == TokenKind::Word
            && inner[1].kind == TokenKind::LParen;
        if is_attr {
            out.push(Bracketed::Attr(read_attribute(src, inner)?));
        } else {
            let text = &src[tokens[i].end..tokens[close].start];
            out.push(Bracketed::Type(text.trim().to_string()));
        }
        i = close + 1;
        while i < tokens.len() && (tokens[i].kind == TokenKind::Newline || tokens[i].is_comment()) {
            i += 1;
        }
    }
    Ok((out, i))
}

/// `Name ( args )` with `inner` excluding the square brackets.
fn read_attribute(src: &str, inner: &[Token]) -> Result<Attribute, ParamError> {
    let name = inner[0].text(src).to_string();
    let close = matching(inner, 1).ok_or(ParamError::Unbalanced)?;
    let args_tokens = &inner[2..close];
    let mut args = Vec::new();
    for piece in split_top_level(args_tokens)? {
        let piece: Vec<&Token> = piece
            .iter()
            .filter(|t| !t.is_comment() && t.kind != TokenKind::Newline)
            .collect();
        let Some(first) = piece.first() else {
            continue;
        };
        let keyed = first.kind == TokenKind::Word
            && (piece.len() == 1 || piece[1].kind == TokenKind::Equals);
        let arg = if keyed {
            let value = piece.get(2).map(|start| {
                let last = piece[piece.len() - 1];
                src[start.start..last.end].trim().to_string()
            });
            AttributeArg {
                key: Some(first.text(src).to_string()),
                value,
            }
        } else {
            let last = piece[piece.len() - 1];
            AttributeArg {
                key: None,
                value: Some(src[first.start..last.end].trim().to_string()),
            }
        };
        args.push(arg);
    }
    Ok(Attribute { name, args })
}

fn parameter_attr(attr: &Attribute) -> ParameterAttr {
    ParameterAttr {
        set: attr
            .string("ParameterSetName")
            .filter(|s| !s.eq_ignore_ascii_case("__AllParameterSets")),
        mandatory: attr.flag("Mandatory"),
        position: attr
            .string("Position")
            .and_then(|p| p.trim().parse().ok()),
        from_pipeline: attr.flag("ValueFromPipeline"),
        from_pipeline_by_name: attr.flag("ValueFromPipelineByPropertyName"),
    }
}

fn matching(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (j, tok) in tokens.iter().enumerate().skip(open) {
        match tok.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !(v.eq_ignore_ascii_case("$false") || v == "0")
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    for q in ['\'', '"'] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return v[1..v.len() - 1].to_string();
        }
    }
    v.to_string()
}

/// `$Name`, `${Name}` or `$script:Name` → `Name`.
fn variable_name(text: &str) -> &str {
    let name = text.trim_start_matches('$');
    let name = name
        .strip_prefix('{')
        .and_then(|n| n.strip_suffix('}'))
        .unwrap_or(name);
    name.rsplit(':').next().unwrap_or(name)
}

fn comment_text(raw: &str) -> String {
    let inner = raw
        .strip_prefix("<#")
        .map(|r| r.strip_suffix("#>").unwrap_or(r))
        .or_else(|| raw.strip_prefix('#'))
        .unwrap_or(raw);
    inner
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn piece_text(src: &str, tokens: &[Token]) -> String {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => src[first.start..last.end].trim().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_list() {
        let params = parse_param_list("$a, [int]$b = 5").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].type_name, None);
        assert_eq!(params[1].type_name.as_deref(), Some("int"));
        assert_eq!(params[1].default_value.as_deref(), Some("5"));
    }

    #[test]
    fn parameter_attribute_settings() {
        let text = "\n  [Parameter(Mandatory, Position = 0, ValueFromPipeline = $true)]\n  [ValidateNotNullOrEmpty()]\n  [string[]]$Path\n";
        let params = parse_param_list(text).unwrap();
        let p = &params[0];
        assert_eq!(p.name, "Path");
        assert_eq!(p.type_name.as_deref(), Some("string[]"));
        assert!(p.mandatory());
        assert_eq!(p.declared_position(), Some(0));
        assert!(p.pipeline_input());
    }

    #[test]
    fn mandatory_false_is_respected() {
        let params = parse_param_list("[Parameter(Mandatory=$false)]$x").unwrap();
        assert!(!params[0].mandatory());
    }

    #[test]
    fn comment_above_parameter() {
        let text = "\n  # The target host\n  [string]$ComputerName,\n  <# Port to use #>\n  [int]$Port = 80\n";
        let params = parse_param_list(text).unwrap();
        assert_eq!(params[0].comment.as_deref(), Some("The target host"));
        assert_eq!(params[1].comment.as_deref(), Some("Port to use"));
        assert_eq!(params[1].default_value.as_deref(), Some("80"));
    }

    #[test]
    fn default_with_commas_inside_parens() {
        let params = parse_param_list("$list = @(1, 2, 3), $next").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].default_value.as_deref(), Some("@(1, 2, 3)"));
    }

    #[test]
    fn parameter_sets() {
        let text = "[Parameter(ParameterSetName='ByName', Mandatory)][string]$Name, [Parameter(ParameterSetName='ById')][int]$Id";
        let params = parse_param_list(text).unwrap();
        assert!(params[0].in_set(Some("ByName")).unwrap().mandatory);
        assert!(params[0].in_set(Some("ById")).is_none());
        assert_eq!(params[1].in_set(Some("ById")).unwrap().set.as_deref(), Some("ById"));
    }

    #[test]
    fn cmdlet_binding() {
        let sig = parse_signature(
            Some("[CmdletBinding(DefaultParameterSetName = 'ByName', PositionalBinding = $false)]"),
            Some("$x"),
        )
        .unwrap();
        assert!(sig.binding.advanced);
        assert_eq!(sig.binding.default_set.as_deref(), Some("ByName"));
        assert!(!sig.binding.positional_binding);
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = parse_param_list("[string]").unwrap_err();
        assert!(matches!(err, ParamError::MissingVariable(_)));
    }

    #[test]
    fn empty_list() {
        assert!(parse_param_list("  \n ").unwrap().is_empty());
    }

    #[test]
    fn switch_detection() {
        let params = parse_param_list("[switch]$Force").unwrap();
        assert!(params[0].is_switch());
    }
}
