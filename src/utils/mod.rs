//! Utility functions and helpers

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Short content hash: the first 8 bytes of the SHA-256, hex encoded
pub fn hash_content(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    hex::encode(&digest[..8])
}

/// Get relative path from base to target
pub fn relative_path(from: &Path, to: &Path) -> Option<String> {
    pathdiff::diff_paths(to, from).map(|p| to_slash(&p))
}

/// Normalize a `/`-separated URL path: drop empty and `.` segments, apply
/// `..`, keep a leading `/`
pub fn clean_path(path: &str) -> String {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Render a path with forward slashes
pub fn to_slash(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Deep-merge `overlay` into `base`. Objects merge key by key, anything else
/// in the overlay replaces the base value.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// `512 B`, `1.50 KB`, `3.20 MB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in UNITS[1..].iter().copied() {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{:.2} {}", size, unit)
}

/// Milliseconds under a second, seconds above
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_hash_content() {
        let hash = hash_content(b"hello world");
        assert_eq!(hash.len(), 16);
        assert_eq!(hash, hash_content(b"hello world"));
        assert_ne!(hash, hash_content(b"hello world!"));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./foo/bar"), "foo/bar");
        assert_eq!(clean_path("foo/../bar"), "bar");
        assert_eq!(clean_path("/foo/./bar/../baz"), "/foo/baz");
        assert_eq!(clean_path("/assets//js/app.js"), "/assets/js/app.js");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/project"), Path::new("/project/dist/js/app.js")).as_deref(),
            Some("dist/js/app.js")
        );
    }

    #[test]
    fn test_merge_json() {
        let mut base = json!({
            "mode": "production",
            "define": { "DEBUG": "false", "VERSION": "\"1\"" },
            "external": ["jquery"]
        });

        merge_json(
            &mut base,
            json!({
                "define": { "DEBUG": "true" },
                "external": ["react"],
                "target": "es2020"
            }),
        );

        assert_eq!(
            base,
            json!({
                "mode": "production",
                "define": { "DEBUG": "true", "VERSION": "\"1\"" },
                "external": ["react"],
                "target": "es2020"
            })
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024 + 200 * 1024), "3.20 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(65)), "65.00s");
    }
}
