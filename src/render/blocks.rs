//! Markdown primitives.

/// ATX heading; levels past 6 are clamped.
pub fn header(level: u8, text: &str) -> String {
    let level = level.clamp(1, 6) as usize;
    format!("{} {}", "#".repeat(level), text)
}

pub fn code_block(lang: &str, body: &str) -> String {
    format!("```{}\n{}\n```", lang, body.trim_end())
}

pub fn bold(text: &str) -> String {
    format!("**{}**", text)
}

pub fn inline_code(text: &str) -> String {
    format!("`{}`", text)
}

/// Pipe table. Cell pipes are escaped and line breaks become `<br>`.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(row(headers.iter().map(|h| h.to_string())));
    lines.push(row(headers.iter().map(|_| "---".to_string())));
    for cells in rows {
        lines.push(row(cells.iter().map(|c| escape_cell(c))));
    }
    lines.join("\n")
}

fn row(cells: impl Iterator<Item = String>) -> String {
    format!("| {} |", cells.collect::<Vec<_>>().join(" | "))
}

fn escape_cell(text: &str) -> String {
    text.trim().replace('|', "\\|").replace("\r\n", "<br>").replace('\n', "<br>")
}
