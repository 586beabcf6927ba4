//! psdoc — generate Markdown documentation from PowerShell comment-based help.
//!
//! - `psdoc render Tools.psm1 scripts/*.ps1 -o docs` writes one document per artifact
//! - `psdoc headings help.txt` rewrites help keywords as Markdown headings

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use psdoc::pipeline::{self, DocumentOptions, RenderedDocument};
use psdoc::{heading, ArtifactRef, Granularity, RenderOptions, Session};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "psdoc",
    version,
    about = "Generate Markdown documentation from PowerShell comment-based help"
)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render scripts, modules or loaded functions to Markdown
    Render(RenderArgs),
    /// Rewrite help keywords of a comment block as Markdown headings
    Headings(HeadingArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Files, directories, glob patterns or names of imported functions
    inputs: Vec<String>,

    /// Parameter and example markers: coarse (bold) or fine (headings)
    #[arg(short, long, default_value = "coarse")]
    granularity: Granularity,

    /// Render a script's functions under the script
    #[arg(long)]
    nested: bool,

    /// Document only the functions of scripts, not the scripts themselves
    #[arg(long)]
    functions: bool,

    /// Level of the top heading
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    heading_level: u8,

    /// Load function definitions from a file so inputs can name them.
    /// Can be specified multiple times.
    #[arg(long = "import", value_name = "FILE")]
    imports: Vec<PathBuf>,

    /// Write one <name>.md per artifact here instead of stdout
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long, conflicts_with = "append")]
    force: bool,

    /// Append to existing output files
    #[arg(long)]
    append: bool,

    /// Also print documents to stdout when writing files
    #[arg(long)]
    pass_thru: bool,
}

#[derive(Args)]
struct HeadingArgs {
    /// Comment block file; reads stdin when omitted
    file: Option<PathBuf>,

    /// Convert only this tag (e.g. EXAMPLE) instead of the standard set
    #[arg(long, requires = "section")]
    tag: Option<String>,

    /// Heading text replacing the tag marker
    #[arg(long, default_value = "")]
    label: String,

    /// Heading placed above the first of repeated tags
    #[arg(long)]
    section: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Render(args) => render(&args),
        Command::Headings(args) => headings(&args),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn render(args: &RenderArgs) -> Result<ExitCode> {
    let mut session = Session::new();
    for import in &args.imports {
        session
            .load_file(import)
            .with_context(|| format!("failed to import {}", import.display()))?;
    }

    let inputs = collect_inputs(&args.inputs, &session)?;
    if inputs.is_empty() {
        bail!("no inputs to document");
    }

    let options = DocumentOptions {
        render: RenderOptions {
            granularity: args.granularity,
            heading_level: args.heading_level,
            ..Default::default()
        },
        nested: args.nested,
        functions_only: args.functions,
    };
    let batch = pipeline::document_inputs(&inputs, &session, &options);

    for diagnostic in &batch.diagnostics {
        warn!("{}", diagnostic);
    }
    for failure in &batch.failures {
        error!(input = %failure.input, "{}", failure.error);
    }

    let mut ok = batch.is_success();
    match args.output {
        Some(ref dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
            for doc in &batch.documents {
                if let Err(e) = write_document(dir, doc, args) {
                    error!("{:#}", e);
                    ok = false;
                    continue;
                }
                if args.pass_thru {
                    print!("{}", doc.markdown);
                }
            }
        }
        None => {
            let all: Vec<&str> = batch.documents.iter().map(|d| d.markdown.as_str()).collect();
            print!("{}", all.join("\n"));
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn write_document(dir: &Path, doc: &RenderedDocument, args: &RenderArgs) -> Result<()> {
    let path = output_path(dir, &doc.name);
    if path.exists() && !args.force && !args.append {
        bail!(
            "{} already exists; use --force to overwrite or --append",
            path.display()
        );
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(args.append)
        .truncate(!args.append)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(doc.markdown.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote document");
    Ok(())
}

fn output_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.md", name))
}

fn headings(args: &HeadingArgs) -> Result<ExitCode> {
    let text = match args.file {
        Some(ref path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            input
        }
    };

    let out = match (&args.tag, &args.section) {
        (Some(tag), Some(section)) => heading::convert_text(tag, &args.label, section, &text),
        _ => heading::help_to_markdown(&text),
    };
    println!("{}", out);
    Ok(ExitCode::SUCCESS)
}

/// File extensions documented when a directory is given.
const SUPPORTED_EXTENSIONS: &[&str] = &["ps1", "psm1"];

/// Turn raw inputs into artifacts. Files and directories come first, then
/// glob patterns; anything else is looked up as a loaded definition.
fn collect_inputs(patterns: &[String], session: &Session) -> Result<Vec<ArtifactRef>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            inputs.push(ArtifactRef::FilePath(path.to_path_buf()));
            continue;
        }
        // Directories are scanned non-recursively
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?;
            let mut files: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file() && has_supported_extension(p))
                .collect();
            files.sort();
            inputs.extend(files.into_iter().map(ArtifactRef::FilePath));
            continue;
        }
        if is_glob(pattern) {
            let mut matches: Vec<_> = glob::glob(pattern)
                .with_context(|| format!("invalid glob pattern: {}", pattern))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();
            if matches.is_empty() {
                warn!("no files matched: {}", pattern);
            }
            matches.sort();
            inputs.extend(matches.into_iter().map(ArtifactRef::FilePath));
            continue;
        }
        inputs.push(ArtifactRef::from_input(pattern, session));
    }
    inputs.dedup();
    Ok(inputs)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_is_markdown() {
        assert_eq!(output_path(Path::new("docs"), "Deploy"), Path::new("docs/Deploy.md"));
    }

    #[test]
    fn glob_detection() {
        assert!(is_glob("scripts/*.ps1"));
        assert!(is_glob("Get-?"));
        assert!(!is_glob("Get-Widget"));
    }

    #[test]
    fn extensions() {
        assert!(has_supported_extension(Path::new("a/Tools.PSM1")));
        assert!(has_supported_extension(Path::new("run.ps1")));
        assert!(!has_supported_extension(Path::new("notes.md")));
    }

    #[test]
    fn unknown_name_is_kept_as_definition() {
        let inputs = collect_inputs(&["Get-Widget".to_string()], &Session::new()).unwrap();
        assert_eq!(inputs, vec![ArtifactRef::DefinitionName("Get-Widget".to_string())]);
    }
}
