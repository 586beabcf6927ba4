//! Loaded definitions and artifact resolution.
//!
//! A [`Session`] stands in for a shell's in-memory function table: loading a
//! file registers each function it defines, keyed by name, so later inputs
//! can refer to a function without naming its file.

use crate::error::{Error, Result};
use crate::parser::ast;
use std::fs;
use std::path::{Path, PathBuf};

/// Handle to a definition loaded into a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallableHandle(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDefinition {
    pub name: String,
    pub source_file: String,
    /// Definition text, including help that precedes the keyword
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Session {
    definitions: Vec<LoadedDefinition>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every function defined in `text`. Returns how many were
    /// loaded.
    pub fn load(&mut self, source_file: &str, text: &str) -> usize {
        let tree = ast::parse(text);
        let mut loaded = 0;
        for node in tree.functions() {
            let Some(func) = node.function() else {
                continue;
            };
            let start = func
                .parts
                .help
                .as_ref()
                .map(|h| h.span.start.min(node.extent.start))
                .unwrap_or(node.extent.start);
            self.definitions.push(LoadedDefinition {
                name: func.name.clone(),
                source_file: source_file.to_string(),
                text: text[start..node.extent.end].to_string(),
            });
            loaded += 1;
        }
        tracing::debug!(source_file, loaded, "loaded definitions");
        loaded
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let text = read(path)?;
        Ok(self.load(&path.to_string_lossy(), &text))
    }

    /// Case-insensitive lookup; the most recently loaded definition wins.
    pub fn lookup(&self, name: &str) -> Option<CallableHandle> {
        self.definitions
            .iter()
            .rposition(|d| d.name.eq_ignore_ascii_case(name))
            .map(CallableHandle)
    }

    pub fn get(&self, handle: CallableHandle) -> Option<&LoadedDefinition> {
        self.definitions.get(handle.0)
    }
}

/// Something documentation can be extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    FilePath(PathBuf),
    /// Name of a definition expected to be loaded in the session
    DefinitionName(String),
    Callable(CallableHandle),
}

impl ArtifactRef {
    /// Classify a bare string: an existing path first, then a loaded
    /// definition, else an unresolved name.
    pub fn from_input(input: &str, session: &Session) -> Self {
        let path = Path::new(input);
        if path.exists() {
            return ArtifactRef::FilePath(path.to_path_buf());
        }
        match session.lookup(input) {
            Some(handle) => ArtifactRef::Callable(handle),
            None => ArtifactRef::DefinitionName(input.to_string()),
        }
    }

    /// Human-readable label for logs.
    pub fn label(&self, session: &Session) -> String {
        match self {
            ArtifactRef::FilePath(path) => path.display().to_string(),
            ArtifactRef::DefinitionName(name) => name.clone(),
            ArtifactRef::Callable(handle) => session
                .get(*handle)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| format!("{:?}", handle)),
        }
    }

    /// Produce the definition text and the file it came from.
    pub fn resolve(&self, session: &Session) -> Result<ResolvedSource> {
        match self {
            ArtifactRef::FilePath(path) => {
                if !path.exists() {
                    return Err(Error::PathResolution(path.display().to_string()));
                }
                Ok(ResolvedSource {
                    source_file: path.to_string_lossy().to_string(),
                    text: read(path)?,
                })
            }
            ArtifactRef::DefinitionName(name) => {
                let handle = session
                    .lookup(name)
                    .ok_or_else(|| Error::PathResolution(name.clone()))?;
                Self::Callable(handle).resolve(session)
            }
            ArtifactRef::Callable(handle) => {
                let def = session
                    .get(*handle)
                    .ok_or_else(|| Error::PathResolution(format!("{:?}", handle)))?;
                Ok(ResolvedSource {
                    source_file: def.source_file.clone(),
                    text: def.text.clone(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub source_file: String,
    pub text: String,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
