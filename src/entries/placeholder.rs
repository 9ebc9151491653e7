//! Filename placeholders in destination patterns
//!
//! A destination such as `js/[basename].js` is expanded once per source file:
//! - `[name]`: file name with extension (`app.ts`)
//! - `[basename]`: file name without extension (`app`)
//! - `[ext]`: extension without the leading dot (`ts`)

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(name|basename|ext)\]").unwrap());

/// Returns true if the destination contains at least one placeholder token
pub fn has_placeholder(dest: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(dest)
}

/// Substitute the placeholders in `dest` with values derived from `src`.
///
/// Each token kind replaces only its first occurrence, `[name]` first, then
/// `[basename]`, then `[ext]`. A repeated token therefore stays in the output
/// as literal text: `[ext]/[basename].[ext]` with `src/app.ts` gives
/// `ts/app.[ext]`.
pub fn substitute(dest: &str, src: &str) -> String {
    let path = Path::new(src);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let basename = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    dest.replacen("[name]", &name, 1)
        .replacen("[basename]", &basename, 1)
        .replacen("[ext]", &ext, 1)
}
