//! Glob expansion rooted at a working directory
//!
//! Patterns are split into a literal base directory and a wildcard tail. Only
//! the base directory is walked, and the walk depth is bounded unless the tail
//! contains `**`.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::ResolutionError;
use crate::utils::to_slash;

/// Characters that make a path segment a pattern rather than a literal name
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Returns true if the string contains any glob syntax
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_META)
}

/// Expand `pattern` against the filesystem and return the matched files,
/// sorted lexicographically.
///
/// Relative patterns are matched against `cwd` and produce paths relative to
/// it; absolute patterns produce absolute paths.
pub fn expand(pattern: &str, cwd: &Path) -> Result<Vec<String>, ResolutionError> {
    let normalized = normalize_pattern(pattern);
    let absolute = Path::new(&normalized).is_absolute();
    let segments: Vec<&str> = normalized.split('/').collect();

    let Some(first_glob) = segments.iter().position(|s| is_glob(s)) else {
        // Nothing to expand: the pattern is a plain path
        let full = cwd.join(&normalized);
        return Ok(match probe(&full, pattern)? {
            Some(meta) if meta.is_file() => vec![normalized],
            _ => Vec::new(),
        });
    };

    let Some(matcher) = compile(&normalized, pattern) else {
        return Ok(Vec::new());
    };

    let base = segments[..first_glob].join("/");
    let tail = &segments[first_glob..];
    let root = if absolute {
        PathBuf::from(if base.is_empty() { "/" } else { base.as_str() })
    } else {
        cwd.join(&base)
    };

    match probe(&root, pattern)? {
        Some(meta) if meta.is_dir() => {}
        _ => {
            debug!("Glob base {} is not a directory", root.display());
            return Ok(Vec::new());
        }
    }

    let recursive = tail.contains(&"**");

    let mut walker = WalkDir::new(&root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(tail.len());
    }

    let mut matches = Vec::new();
    let entries = walker.into_iter().filter_entry(|e| {
        e.depth() == 0
            || !is_hidden(e.file_name())
            || dot_allowed(tail, e.depth(), e.file_type().is_dir())
    });

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) {
                    // Removed while walking
                    continue;
                }
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                return Err(ResolutionError::Walk {
                    pattern: pattern.to_string(),
                    path,
                    source: io::Error::from(err),
                });
            }
        };

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let candidate = if absolute {
            to_slash(entry.path())
        } else {
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if base.is_empty() {
                to_slash(rel)
            } else {
                format!("{}/{}", base, to_slash(rel))
            }
        };

        if matcher.is_match(&candidate) {
            matches.push(candidate);
        }
    }

    matches.sort();
    matches.dedup();

    debug!("Glob {} matched {} file(s)", pattern, matches.len());

    Ok(matches)
}

/// Stat `path`. `None` when it cannot exist; any other failure is an error.
fn probe(path: &Path, pattern: &str) -> Result<Option<Metadata>, ResolutionError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(source) => Err(ResolutionError::Walk {
            pattern: pattern.to_string(),
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Whether a dot-named entry at walk `depth` may be visited.
///
/// Above the first `**` a dot name is only reached through a tail segment
/// that starts with `.` itself. `**` never descends into dot directories, but
/// a later dot segment may still name them.
fn dot_allowed(tail: &[&str], depth: usize, is_dir: bool) -> bool {
    let index = depth - 1;
    match tail.iter().position(|s| *s == "**") {
        Some(star) if index >= star => {
            let after = &tail[star + 1..];
            match after.split_last() {
                Some((last, dirs)) => {
                    if is_dir {
                        dirs.iter().any(|s| s.starts_with('.'))
                    } else {
                        last.starts_with('.')
                    }
                }
                None => false,
            }
        }
        _ => tail.get(index).is_some_and(|s| s.starts_with('.')),
    }
}

/// Build the matcher. A pattern globset rejects, such as an unclosed `[` or
/// `{`, is retried with its brackets taken literally; if that fails too it
/// matches nothing.
fn compile(normalized: &str, pattern: &str) -> Option<GlobMatcher> {
    match build_matcher(normalized) {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            warn!("Glob {} is not a valid pattern, matching brackets literally: {}", pattern, e);
            match build_matcher(&escape_brackets(normalized)) {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    warn!("Glob {} matches nothing: {}", pattern, e);
                    None
                }
            }
        }
    }
}

fn build_matcher(glob: &str) -> Result<GlobMatcher, globset::Error> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
}

fn escape_brackets(glob: &str) -> String {
    let mut escaped = String::with_capacity(glob.len());
    for c in glob.chars() {
        if matches!(c, '[' | ']' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Drop `.` segments and repeated separators so the pattern lines up with the
/// paths produced by the walk. `[^...]` classes are rewritten to `[!...]`.
fn normalize_pattern(pattern: &str) -> String {
    let pattern = pattern.replace("[^", "[!");
    let absolute = pattern.starts_with('/');
    let parts: Vec<&str> = pattern
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if absolute {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
