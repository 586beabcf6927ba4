//! Markdown renderer for documentation records.
//!
//! Every section is built by its own function returning an owned block; a
//! record renders as those blocks joined by blank lines.

use super::blocks::{bold, code_block, header, inline_code, table};
use super::{Granularity, RenderOptions};
use crate::model::*;

const PARAMETER_COLUMNS: [&str; 6] = [
    "Name",
    "DefaultValue",
    "Required",
    "ParameterValue",
    "Position",
    "PipelineInput",
];

pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        MarkdownRenderer { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render one record as a standalone document.
    pub fn render(&self, record: &DocumentationRecord) -> String {
        tracing::debug!(name = %record.name, granularity = %self.options.granularity, "rendering");
        finish(self.record_blocks(record, self.options.heading_level, true))
    }

    /// Render a script followed by a "Functions" section holding its
    /// functions, two levels deeper and without metadata.
    pub fn render_with_nested(
        &self,
        script: &DocumentationRecord,
        functions: &[DocumentationRecord],
    ) -> String {
        let level = self.options.heading_level;
        let mut blocks = self.record_blocks(script, level, true);
        if !functions.is_empty() {
            blocks.push(header(level.saturating_add(1), "Functions"));
            for function in functions {
                blocks.extend(self.record_blocks(function, level.saturating_add(2), false));
            }
        }
        finish(blocks)
    }

    fn record_blocks(&self, record: &DocumentationRecord, level: u8, metadata: bool) -> Vec<String> {
        let sub = level.saturating_add(1);
        [
            Some(header(level, &record.name)),
            metadata.then(|| self.metadata(record)),
            Some(syntax(record, sub)),
            prose(record, sub, "Synopsis", &record.synopsis),
            prose(record, sub, "Description", &record.description),
            self.parameters(record, sub),
            self.examples(record, sub),
            notes(record, sub),
            release_notes(record, sub),
            list_section(sub, "Inputs", &record.inputs, |s| s.to_string()),
            list_section(sub, "Outputs", &record.outputs, |s| s.to_string()),
            list_section(sub, "Related Links", &record.links, |s| format!("- {}", s)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn metadata(&self, record: &DocumentationRecord) -> String {
        let mut lines = vec![format!("FileName: {}", record.file_name())];
        if let Some(ref info) = record.script_info {
            lines.push(format!("Version: {}", info.version));
            let optional = [
                ("Guid", &info.guid),
                ("Author", &info.author),
                ("CompanyName", &info.company_name),
                ("Copyright", &info.copyright),
            ];
            for (key, value) in optional {
                if let Some(value) = value {
                    lines.push(format!("{}: {}", key, value));
                }
            }
            if !info.tags.is_empty() {
                lines.push(format!("Tags: {}", info.tags.join(", ")));
            }
        }
        lines.push(format!("Generated: {}", self.options.generated.format("%m.%d.%Y")));
        code_block("YAML", &lines.join("\n"))
    }

    /// Per-item marker: a heading in fine mode, bold text in coarse mode.
    fn marker(&self, level: u8, text: &str) -> String {
        match self.options.granularity {
            Granularity::Fine => header(level, text),
            Granularity::Coarse => bold(text),
        }
    }

    fn parameters(&self, record: &DocumentationRecord, level: u8) -> Option<String> {
        if record.parameters.is_empty() {
            return None;
        }
        let mut parts = vec![header(level, "Parameters")];
        for param in &record.parameters {
            parts.push(self.marker(level.saturating_add(1), &inline_code(&param.name)));
            if !param.description.trim().is_empty() {
                parts.push(param.description.trim().to_string());
            }
            parts.push(bold("Parameter Details"));
            parts.push(table(&PARAMETER_COLUMNS, &[parameter_row(param)]));
        }
        Some(parts.join("\n\n"))
    }

    fn examples(&self, record: &DocumentationRecord, level: u8) -> Option<String> {
        if record.examples.is_empty() {
            return None;
        }
        let mut parts = vec![header(level, "Examples")];
        for example in &record.examples {
            parts.push(self.marker(level.saturating_add(1), &title_case(&example.title)));
            parts.push(code_block("PowerShell", &example.body));
        }
        Some(parts.join("\n\n"))
    }
}

fn finish(blocks: Vec<String>) -> String {
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn syntax(record: &DocumentationRecord, level: u8) -> String {
    format!(
        "{}\n\n{}",
        header(level, "Syntax"),
        code_block("PowerShell", record.syntax.trim())
    )
}

/// Synopsis and description are dropped when blank or when they mention the
/// file name.
fn prose(record: &DocumentationRecord, level: u8, title: &str, text: &str) -> Option<String> {
    let text = text.trim();
    let file_name = record.file_name();
    if text.is_empty() || (!file_name.is_empty() && text.contains(file_name)) {
        return None;
    }
    Some(format!("{}\n\n{}", header(level, title), text))
}

fn notes(record: &DocumentationRecord, level: u8) -> Option<String> {
    let text = record.notes.trim();
    (!text.is_empty()).then(|| format!("{}\n\n{}", header(level, "Notes"), text))
}

fn release_notes(record: &DocumentationRecord, level: u8) -> Option<String> {
    let text = record.script_info.as_ref()?.release_notes.as_deref()?.trim();
    (!text.is_empty()).then(|| format!("{}\n\n{}", header(level, "Release Notes"), text))
}

fn list_section(
    level: u8,
    title: &str,
    items: &[String],
    item: impl Fn(&str) -> String,
) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let body: Vec<String> = items.iter().map(|s| item(s.trim())).collect();
    let sep = if title == "Related Links" { "\n" } else { "\n\n" };
    Some(format!("{}\n\n{}", header(level, title), body.join(sep)))
}

fn parameter_row(param: &ParameterRecord) -> Vec<String> {
    vec![
        param.name.clone(),
        param.default_value.clone(),
        param.required.to_string(),
        param.parameter_value.clone(),
        param
            .position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "named".to_string()),
        param.pipeline_input.to_string(),
    ]
}

/// Lowercase everything, then capitalize the first letter of each
/// whitespace-separated word.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn options(granularity: Granularity) -> RenderOptions {
        RenderOptions {
            granularity,
            heading_level: 1,
            generated: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        }
    }

    fn param(name: &str, description: &str) -> ParameterRecord {
        ParameterRecord {
            name: name.to_string(),
            description: description.to_string(),
            default_value: String::new(),
            required: false,
            parameter_value: "string".to_string(),
            position: None,
            pipeline_input: false,
        }
    }

    fn record() -> DocumentationRecord {
        DocumentationRecord {
            name: "Get-Widget".to_string(),
            source_file: "src/Widgets.psm1".to_string(),
            syntax: "Get-Widget [[-Name] <string>] [-Tag <string>]".to_string(),
            synopsis: "Gets widgets.".to_string(),
            description: "Reads widgets from the store.".to_string(),
            parameters: vec![param("Name", "Widget name."), param("Tag", "")],
            examples: vec![ExampleRecord {
                title: "EXAMPLE 1".to_string(),
                body: "Get-Widget -Name a".to_string(),
            }],
            notes: "Internal.".to_string(),
            ..Default::default()
        }
    }

    fn heading_count(text: &str) -> usize {
        text.lines().filter(|l| l.starts_with('#')).count()
    }

    #[test]
    fn renders_sections_in_order() {
        let out = MarkdownRenderer::new(options(Granularity::Coarse)).render(&record());
        let order = [
            "# Get-Widget",
            "```YAML\nFileName: Widgets.psm1\nGenerated: 03.07.2024\n```",
            "## Syntax\n\n```PowerShell\nGet-Widget [[-Name] <string>] [-Tag <string>]\n```",
            "## Synopsis\n\nGets widgets.",
            "## Description",
            "## Parameters",
            "**`Name`**\n\nWidget name.\n\n**Parameter Details**",
            "| Name |  | false | string | named | false |",
            "## Examples\n\n**Example 1**\n\n```PowerShell\nGet-Widget -Name a\n```",
            "## Notes\n\nInternal.",
        ];
        let mut from = 0;
        for needle in order {
            let at = out[from..].find(needle).unwrap_or_else(|| panic!("missing {needle:?} in {out}"));
            from += at + needle.len();
        }
        assert!(out.contains("| Name | DefaultValue | Required | ParameterValue | Position | PipelineInput |"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let renderer = MarkdownRenderer::new(options(Granularity::Fine));
        assert_eq!(renderer.render(&record()), renderer.render(&record()));
    }

    #[test]
    fn fine_adds_three_headings_over_coarse() {
        let coarse = MarkdownRenderer::new(options(Granularity::Coarse)).render(&record());
        let fine = MarkdownRenderer::new(options(Granularity::Fine)).render(&record());
        assert_eq!(heading_count(&fine), heading_count(&coarse) + 3);
        assert!(fine.contains("### `Name`"));
        assert!(fine.contains("### `Tag`"));
        assert!(fine.contains("### Example 1"));

        let normalized = fine
            .replace("### `Name`", "**`Name`**")
            .replace("### `Tag`", "**`Tag`**")
            .replace("### Example 1", "**Example 1**");
        assert_eq!(normalized, coarse);
    }

    #[test]
    fn blank_synopsis_is_omitted() {
        let mut r = record();
        r.synopsis = String::new();
        let out = MarkdownRenderer::new(options(Granularity::Coarse)).render(&r);
        assert!(!out.contains("Synopsis"));
        assert!(out.contains("## Description"));
    }

    #[test]
    fn prose_mentioning_file_name_is_omitted() {
        let mut r = record();
        r.description = "See Widgets.psm1 for details.".to_string();
        let out = MarkdownRenderer::new(options(Granularity::Coarse)).render(&r);
        assert!(!out.contains("## Description"));
    }

    #[test]
    fn empty_record_renders_header_metadata_and_syntax() {
        let r = DocumentationRecord {
            name: "Empty".to_string(),
            source_file: "Empty.ps1".to_string(),
            syntax: "Empty".to_string(),
            ..Default::default()
        };
        let out = MarkdownRenderer::new(options(Granularity::Fine)).render(&r);
        assert_eq!(heading_count(&out), 2);
        assert!(!out.contains("Parameters"));
        assert!(!out.contains("Examples"));
    }

    #[test]
    fn script_version_in_metadata() {
        let mut r = record();
        r.script_info = Some(ScriptInfo {
            version: "1.2.0".to_string(),
            ..Default::default()
        });
        let out = MarkdownRenderer::new(options(Granularity::Coarse)).render(&r);
        assert!(out.contains("FileName: Widgets.psm1\nVersion: 1.2.0\nGenerated: 03.07.2024"));
        assert!(!out.contains("Release Notes"));
    }

    #[test]
    fn script_info_fields_in_metadata() {
        let mut r = record();
        r.script_info = Some(ScriptInfo {
            version: "2.0".to_string(),
            guid: Some("6f1b4a8e-2c3d-4e5f-8a9b-0c1d2e3f4a5b".to_string()),
            author: Some("ops".to_string()),
            company_name: None,
            copyright: Some("(c) ops".to_string()),
            tags: vec!["deploy".to_string(), "build".to_string()],
            release_notes: Some("First release.".to_string()),
        });
        let out = MarkdownRenderer::new(options(Granularity::Coarse)).render(&r);
        assert!(out.contains(concat!(
            "```YAML\n",
            "FileName: Widgets.psm1\n",
            "Version: 2.0\n",
            "Guid: 6f1b4a8e-2c3d-4e5f-8a9b-0c1d2e3f4a5b\n",
            "Author: ops\n",
            "Copyright: (c) ops\n",
            "Tags: deploy, build\n",
            "Generated: 03.07.2024\n",
            "```"
        )));
        assert!(out.contains("## Notes\n\nInternal.\n\n## Release Notes\n\nFirst release."));
    }

    #[test]
    fn extra_sections() {
        let mut r = record();
        r.inputs = vec!["System.String".to_string()];
        r.links = vec!["https://a.example".to_string(), "Get-Item".to_string()];
        let out = MarkdownRenderer::new(options(Granularity::Coarse)).render(&r);
        assert!(out.contains("## Inputs\n\nSystem.String"));
        assert!(!out.contains("## Outputs"));
        assert!(out.contains("## Related Links\n\n- https://a.example\n- Get-Item"));
    }

    #[test]
    fn nested_functions_are_two_levels_deeper() {
        let script = DocumentationRecord {
            name: "Deploy".to_string(),
            source_file: "Deploy.ps1".to_string(),
            syntax: "Deploy.ps1".to_string(),
            synopsis: "Deploys.".to_string(),
            ..Default::default()
        };
        let renderer = MarkdownRenderer::new(options(Granularity::Fine));
        let out = renderer.render_with_nested(&script, &[record()]);
        assert!(out.starts_with("# Deploy\n\n```YAML\nFileName: Deploy.ps1"));
        assert!(out.contains("\n## Functions\n\n### Get-Widget\n\n#### Syntax"));
        assert!(out.contains("##### `Name`"));
        assert_eq!(out.matches("```YAML").count(), 1);
    }

    #[test]
    fn deep_headings_clamp_at_six() {
        let mut opts = options(Granularity::Fine);
        opts.heading_level = 4;
        let out = MarkdownRenderer::new(opts).render_with_nested(&record(), &[record()]);
        assert!(out.contains("###### Get-Widget"));
        assert!(out.contains("###### `Name`"));
        assert!(!out.contains("#######"));
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("EXAMPLE 1"), "Example 1");
        assert_eq!(title_case("get  the WIDGET"), "Get  The Widget");
        assert_eq!(title_case(""), "");
    }
}
