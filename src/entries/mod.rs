//! Entry resolution
//!
//! Expands the declarative `entries` table of the configuration into the
//! literal entry-point table handed to the bundler:
//!
//! ```toml
//! [entries]
//! "js/[basename].js" = "src/*.[jt]s"       # one entry per match
//! "js/vendor.js" = ["lib/a.js", "lib/b.js"] # one entry bundling both files
//! "css/app.css" = "src/app.css"             # existing file, used as-is
//! ```
//!
//! A bare string that names an existing file is always taken literally, even
//! when the destination contains placeholders. Anything else is expanded as a
//! glob. `{ glob = "..." }` and `{ file = "..." }` skip the filesystem probe.

pub mod glob;
pub mod placeholder;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use placeholder::{has_placeholder, substitute};

/// Mapping from destination pattern to source specification
pub type EntrySpec = BTreeMap<String, SourceSpec>;

/// Mapping from concrete destination path to its source file(s)
pub type ResolvedEntryTable = BTreeMap<String, EntrySource>;

/// Source side of an `entries` item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    /// Literal path if it exists on disk, glob pattern otherwise
    Auto(String),

    /// Ordered list of literal paths
    List(Vec<String>),

    /// Always expanded as a glob
    Glob { glob: String },

    /// Always taken literally
    File { file: String },
}

/// Resolved source of a single bundler entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySource {
    Single(String),
    Multiple(Vec<String>),
}

impl EntrySource {
    /// All source paths of this entry, in bundling order
    pub fn as_slice(&self) -> &[String] {
        match self {
            EntrySource::Single(path) => std::slice::from_ref(path),
            EntrySource::Multiple(paths) => paths,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Filesystem failure while resolving entries. A pattern that matches nothing
/// is not an error.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to check entry source {}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to expand `{pattern}` while reading {}", .path.display())]
    Walk {
        pattern: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolve every item of `spec` against `cwd`.
///
/// When several sources land on the same destination after placeholder
/// substitution, the one resolved last wins.
pub fn resolve(spec: &EntrySpec, cwd: &Path) -> Result<ResolvedEntryTable, ResolutionError> {
    let mut entries = ResolvedEntryTable::new();

    for (dest, source) in spec {
        let templated = has_placeholder(dest);

        match source {
            SourceSpec::List(sources) => {
                if templated {
                    for src in sources {
                        insert_single(&mut entries, substitute(dest, src), src);
                    }
                } else {
                    entries.insert(dest.clone(), EntrySource::Multiple(sources.clone()));
                }
            }
            SourceSpec::File { file } => insert_single(&mut entries, dest.clone(), file),
            SourceSpec::Glob { glob } => insert_matches(&mut entries, dest, glob, cwd, templated)?,
            SourceSpec::Auto(path) => {
                if source_exists(cwd, path)? {
                    insert_single(&mut entries, dest.clone(), path);
                } else {
                    insert_matches(&mut entries, dest, path, cwd, templated)?;
                }
            }
        }
    }

    debug!("Resolved {} entries from {} patterns", entries.len(), spec.len());

    Ok(entries)
}

fn insert_single(entries: &mut ResolvedEntryTable, dest: String, src: &str) {
    if let Some(previous) = entries.insert(dest.clone(), EntrySource::Single(src.to_string())) {
        debug!(
            "Entry {} now points to {} (was {:?})",
            dest,
            src,
            previous.as_slice()
        );
    }
}

fn insert_matches(
    entries: &mut ResolvedEntryTable,
    dest: &str,
    pattern: &str,
    cwd: &Path,
    templated: bool,
) -> Result<(), ResolutionError> {
    let matches = glob::expand(pattern, cwd)?;

    if templated {
        for file in &matches {
            insert_single(entries, substitute(dest, file), file);
        }
    } else {
        entries.insert(dest.to_string(), EntrySource::Multiple(matches));
    }

    Ok(())
}

/// Probe `cwd/src`. A path that cannot exist (missing parent, file used as a
/// directory) counts as absent.
fn source_exists(cwd: &Path, src: &str) -> Result<bool, ResolutionError> {
    let path = cwd.join(src);

    match fs::metadata(&path) {
        Ok(_) => Ok(true),
        Err(err) if matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(false)
        }
        Err(source) => Err(ResolutionError::Probe { path, source }),
    }
}
