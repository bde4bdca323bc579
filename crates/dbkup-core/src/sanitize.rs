//! Cleaning of user-supplied names before they touch the file system

use std::path::Path;

/// Token substituted when a name sanitizes to nothing.
pub const DEFAULT_TOKEN: &str = "db";

/// Reduce an arbitrary string to a safe file-name token.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`, then only the final
/// path segment is kept. The result is never empty.
///
/// # Example
/// ```
/// use dbkup_core::sanitize;
/// assert_eq!(sanitize("nightly run/2"), "nightly_run_2");
/// assert_eq!(sanitize(""), "db");
/// ```
pub fn sanitize(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let token = Path::new(&replaced)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    if token.is_empty() {
        DEFAULT_TOKEN.to_string()
    } else {
        token
    }
}

/// Sanitize a backup label, falling back to `default_label` when the trimmed
/// input is empty.
pub fn sanitize_label(raw: &str, default_label: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        sanitize(default_label)
    } else {
        sanitize(trimmed)
    }
}

/// Keep only the final path segment of a file name read back from a client.
///
/// Unlike [`sanitize`] this preserves dots so that `backup-x.sql` survives,
/// but returns `None` for names that cannot refer to a regular file inside
/// the backup directory (`""`, `"."`, `".."`, hidden names).
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let name = Path::new(&normalized).file_name()?.to_str()?;
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe(s: &str) -> bool {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    #[test]
    fn test_sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize("my backup!"), "my_backup_");
        assert_eq!(sanitize("prod-db_2024"), "prod-db_2024");
        assert_eq!(sanitize("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize("naïve"), "na_ve");
    }

    #[test]
    fn test_sanitize_never_empty() {
        assert_eq!(sanitize(""), DEFAULT_TOKEN);
        for input in ["", " ", "/", "..", "\0", "💾", "a/b\\c", "'; DROP TABLE x; --"] {
            let out = sanitize(input);
            assert!(is_safe(&out), "unsafe output {:?} for {:?}", out, input);
        }
    }

    #[test]
    fn test_sanitize_label_default() {
        assert_eq!(sanitize_label("   ", "bkup-database"), "bkup-database");
        assert_eq!(sanitize_label(" nightly ", "bkup-database"), "nightly");
    }

    #[test]
    fn test_sanitize_file_name_strips_directories() {
        assert_eq!(
            sanitize_file_name("../../etc/passwd"),
            Some("passwd".to_string())
        );
        assert_eq!(
            sanitize_file_name("..\\..\\backup-x.sql"),
            Some("backup-x.sql".to_string())
        );
        assert_eq!(
            sanitize_file_name("backup-db-2024-01-01_00-00-00.sql"),
            Some("backup-db-2024-01-01_00-00-00.sql".to_string())
        );
    }

    #[test]
    fn test_sanitize_file_name_rejects_special_names() {
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("/"), None);
        assert_eq!(sanitize_file_name(".backup-x.sql.partial"), None);
    }
}
