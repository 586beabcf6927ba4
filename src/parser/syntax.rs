//! Signature introspection: the syntax lines a shell would print for a
//! command, one per parameter set.

use super::params::{ParamDecl, Signature};

/// Effective binding position of each parameter, by declaration index.
///
/// Simple functions bind every non-switch parameter positionally. Advanced
/// functions do the same unless positional binding is off or any parameter
/// declares an explicit position, in which case only declared positions
/// count.
pub fn positions(sig: &Signature) -> Vec<Option<u32>> {
    let any_declared = sig.params.iter().any(|p| p.declared_position().is_some());
    if sig.binding.advanced && (any_declared || !sig.binding.positional_binding) {
        return sig.params.iter().map(|p| p.declared_position()).collect();
    }

    let mut next = 0;
    sig.params
        .iter()
        .map(|p| {
            if p.is_switch() {
                None
            } else {
                next += 1;
                Some(next - 1)
            }
        })
        .collect()
}

/// Parameter set names in display order: the default set first, then the
/// order of first appearance.
fn parameter_sets(sig: &Signature) -> Vec<Option<String>> {
    let mut sets: Vec<String> = Vec::new();
    for attr in sig.params.iter().flat_map(|p| p.parameter_attrs.iter()) {
        if let Some(ref set) = attr.set {
            if !sets.iter().any(|s| s.eq_ignore_ascii_case(set)) {
                sets.push(set.clone());
            }
        }
    }
    if sets.is_empty() {
        return vec![None];
    }
    if let Some(ref default) = sig.binding.default_set {
        if let Some(idx) = sets.iter().position(|s| s.eq_ignore_ascii_case(default)) {
            let default = sets.remove(idx);
            sets.insert(0, default);
        }
    }
    sets.into_iter().map(Some).collect()
}

/// Raw syntax text: each set on its own line, separated by blank lines and
/// CRLF-terminated. Use [`normalize`] before display.
pub fn introspect(command: &str, sig: &Signature) -> String {
    let positions = positions(sig);
    let lines: Vec<String> = parameter_sets(sig)
        .iter()
        .map(|set| set_line(command, sig, &positions, set.as_deref()))
        .collect();
    format!("\r\n{}\r\n", lines.join("\r\n\r\n"))
}

fn set_line(command: &str, sig: &Signature, positions: &[Option<u32>], set: Option<&str>) -> String {
    let mut members: Vec<(usize, &ParamDecl, bool)> = sig
        .params
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.in_set(set).map(|attr| (i, p, attr.mandatory)))
        .collect();
    // Positional first by position, then named in declaration order
    members.sort_by_key(|(i, _, _)| (positions[*i].is_none(), positions[*i], *i));

    let mut line = command.to_string();
    for (i, param, mandatory) in members {
        line.push(' ');
        line.push_str(&fragment(param, positions[i].is_some(), mandatory));
    }
    if sig.binding.advanced {
        line.push_str(" [<CommonParameters>]");
    }
    line
}

fn fragment(param: &ParamDecl, positional: bool, mandatory: bool) -> String {
    if param.is_switch() {
        return if mandatory {
            format!("-{}", param.name)
        } else {
            format!("[-{}]", param.name)
        };
    }
    let ty = param.display_type();
    match (mandatory, positional) {
        (true, true) => format!("[-{}] <{}>", param.name, ty),
        (true, false) => format!("-{} <{}>", param.name, ty),
        (false, true) => format!("[[-{}] <{}>]", param.name, ty),
        (false, false) => format!("[-{} <{}>]", param.name, ty),
    }
}

/// Strip carriage returns and blank segments, keep one set per line.
pub fn normalize(raw: &str) -> String {
    raw.replace('\r', "")
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::params::parse_signature;

    fn syntax(attrs: Option<&str>, params: &str) -> String {
        let sig = parse_signature(attrs, Some(params)).unwrap();
        normalize(&introspect("Test-Function", &sig))
    }

    #[test]
    fn mandatory_positional_string() {
        assert_eq!(
            syntax(None, "[Parameter(Mandatory, Position=0)][String]$Parameter"),
            "Test-Function [-Parameter] <String> [<CommonParameters>]"
        );
    }

    #[test]
    fn simple_function_is_positional() {
        assert_eq!(
            syntax(None, "$a, [int]$b, [switch]$Force"),
            "Test-Function [[-a] <Object>] [[-b] <int>] [-Force]"
        );
    }

    #[test]
    fn advanced_named_when_position_declared() {
        assert_eq!(
            syntax(
                Some("[CmdletBinding()]"),
                "[Parameter(Position=0)][string]$Path, [int]$Depth"
            ),
            "Test-Function [[-Path] <string>] [-Depth <int>] [<CommonParameters>]"
        );
    }

    #[test]
    fn positional_binding_off() {
        assert_eq!(
            syntax(
                Some("[CmdletBinding(PositionalBinding=$false)]"),
                "[Parameter(Mandatory)][string]$Name"
            ),
            "Test-Function -Name <string> [<CommonParameters>]"
        );
    }

    #[test]
    fn parameter_sets_one_line_each() {
        let out = syntax(
            Some("[CmdletBinding(DefaultParameterSetName='ById')]"),
            "[Parameter(ParameterSetName='ByName', Mandatory)][string]$Name, [Parameter(ParameterSetName='ById', Mandatory)][int]$Id, [switch]$Force",
        );
        assert_eq!(
            out,
            "Test-Function [-Id] <int> [-Force] [<CommonParameters>]\nTest-Function [-Name] <string> [-Force] [<CommonParameters>]"
        );
    }

    #[test]
    fn no_parameters() {
        let sig = Signature::default();
        assert_eq!(normalize(&introspect("Get-Nothing", &sig)), "Get-Nothing");
    }

    #[test]
    fn normalize_drops_blank_segments() {
        assert_eq!(normalize("\r\nA\r\n\r\n  \r\nB\r\n"), "A\nB");
    }
}
