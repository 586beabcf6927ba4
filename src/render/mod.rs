//! Markdown rendering of documentation records.

pub mod blocks;
pub mod markdown;

pub use markdown::MarkdownRenderer;

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// How much structure the per-parameter and per-example markers get.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    /// Bold text markers
    #[default]
    Coarse,
    /// Sub-headings
    Fine,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coarse" => Ok(Granularity::Coarse),
            "fine" => Ok(Granularity::Fine),
            _ => Err(format!("unknown granularity: {}. Use coarse or fine", s)),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Coarse => f.write_str("coarse"),
            Granularity::Fine => f.write_str("fine"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub granularity: Granularity,
    /// Level of the top heading, 1 for `#`
    pub heading_level: u8,
    /// Date stamped into the metadata block
    pub generated: NaiveDate,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            granularity: Granularity::default(),
            heading_level: 1,
            generated: chrono::Local::now().date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_parses_case_insensitively() {
        assert_eq!("Fine".parse::<Granularity>().unwrap(), Granularity::Fine);
        assert_eq!("coarse".parse::<Granularity>().unwrap(), Granularity::Coarse);
        assert!("medium".parse::<Granularity>().is_err());
    }
}
