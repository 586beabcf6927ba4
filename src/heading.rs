//! Tagged comment lines → Markdown headings.
//!
//! A tag that appears once becomes a top-level heading. A repeated tag gets a
//! section heading above its first occurrence and a second-level heading per
//! occurrence.

use regex::{Regex, RegexBuilder};

/// Tags rewritten by [`help_to_markdown`]: (tag, label, section heading).
const HELP_TAGS: [(&str, &str, &str); 8] = [
    ("SYNOPSIS", "Synopsis", "Synopsis"),
    ("DESCRIPTION", "Description", "Description"),
    ("PARAMETER", "", "Parameters"),
    ("EXAMPLE", "Example", "Examples"),
    ("INPUTS", "Inputs", "Inputs"),
    ("OUTPUTS", "Outputs", "Outputs"),
    ("NOTES", "Notes", "Notes"),
    ("LINK", "Related Links", "Related Links"),
];

fn tag_regex(tag: &str) -> Option<Regex> {
    RegexBuilder::new(&format!(r"^\.{}", regex::escape(tag)))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Rewrite every `.TAG` line of `lines`.
///
/// Leading spaces and tabs are stripped from all lines when the tag occurs.
/// With no occurrence the input comes back unchanged.
pub fn convert<S: AsRef<str>>(
    tag: &str,
    replacement_label: &str,
    section_heading: &str,
    lines: &[S],
) -> Vec<String> {
    let original = || lines.iter().map(|l| l.as_ref().to_string()).collect();
    let Some(re) = tag_regex(tag) else {
        return original();
    };

    let stripped: Vec<&str> = lines
        .iter()
        .map(|l| l.as_ref().trim_start_matches([' ', '\t']))
        .collect();
    let count = stripped.iter().filter(|l| re.is_match(l)).count();
    if count == 0 {
        return original();
    }

    let marker = if count > 1 { "##" } else { "#" };
    let mut out = Vec::with_capacity(stripped.len() + 2);
    let mut first = true;
    for line in stripped {
        let Some(m) = re.find(line) else {
            out.push(line.to_string());
            continue;
        };
        if count > 1 && first {
            out.push(format!("# {}", section_heading));
            out.push(String::new());
        }
        first = false;
        let heading = [marker, replacement_label, line[m.end()..].trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        out.push(heading);
    }
    out
}

/// [`convert`] over a text blob split on `\n`.
pub fn convert_text(tag: &str, replacement_label: &str, section_heading: &str, text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    convert(tag, replacement_label, section_heading, &lines).join("\n")
}

/// Turn a whole help comment into Markdown headings for the standard help
/// keywords. Comment delimiters are dropped.
pub fn help_to_markdown(text: &str) -> String {
    let mut lines: Vec<String> = text
        .split('\n')
        .filter(|l| !matches!(l.trim(), "<#" | "#>"))
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect();
    for (tag, label, section) in HELP_TAGS {
        lines = convert(tag, label, section, &lines);
    }
    lines.join("\n").trim().to_string()
}
