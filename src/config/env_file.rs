//! Env-file store: rewrites a single `KEY=VALUE` line in the active scope file.
//!
//! # Layout
//! ```text
//! <root>/.env          base file, holds APP_ENV=<scope>
//! <root>/.env.<scope>  scope file, the one that gets rewritten
//! ```
//!
//! # Design Decisions
//! - Only the value segment of matching lines changes; comments, blank
//!   lines, ordering and CRLF endings are kept as they are
//! - Writes go to a sibling temp file which is renamed over the target,
//!   so readers see either the old or the new file, never a mix
//! - No locking: concurrent writers race and the last rename wins

use regex::bytes::{NoExpand, Regex};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::error::ConfigError;

/// Key in the base file naming the active scope.
pub const SCOPE_KEY: &str = "APP_ENV";

/// Default base env file name.
pub const DEFAULT_BASE_FILE: &str = ".env";

/// Locates and rewrites keys in the env file of the active scope.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    root: PathBuf,
    base_file: String,
}

impl EnvFileStore {
    /// Store rooted at `root` using the default `.env` base file.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_base_file(root, DEFAULT_BASE_FILE)
    }

    pub fn with_base_file(root: impl Into<PathBuf>, base_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_file: base_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_file(&self) -> &str {
        &self.base_file
    }

    /// Path of the base env file.
    pub fn base_path(&self) -> PathBuf {
        self.root.join(&self.base_file)
    }

    /// Path of the env file for `scope` (`<base>.<scope>`).
    pub fn scope_path(&self, scope: &str) -> PathBuf {
        self.root.join(format!("{}.{}", self.base_file, scope))
    }

    /// Read the active scope name from the base file.
    pub fn active_scope(&self) -> Result<String, ConfigError> {
        let path = self.base_path();
        let content = fs::read(&path).map_err(|e| ConfigError::ScopeNotFound {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        parse_scope(&String::from_utf8_lossy(&content)).ok_or_else(|| ConfigError::ScopeNotFound {
            path,
            reason: format!("no {SCOPE_KEY}=<name> line"),
        })
    }

    /// Replace the value of `key` in the active scope file.
    ///
    /// Returns the path of the rewritten file. On error the file is left
    /// byte-identical.
    pub fn update(&self, key: &str, value: &str) -> Result<PathBuf, ConfigError> {
        let scope = self.active_scope()?;
        let path = self.scope_path(&scope);

        if !path.is_file() {
            return Err(ConfigError::FileNotFound { path });
        }

        rewrite_key(&path, key, value)?;

        tracing::info!(
            key = %key,
            scope = %scope,
            path = %path.display(),
            "Env file updated"
        );
        Ok(path)
    }
}

/// First `APP_ENV=<word>` line, where a word is ASCII letters, digits and `_`.
fn parse_scope(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let scope = line.strip_prefix(SCOPE_KEY)?.strip_prefix('=')?;
        let is_word =
            !scope.is_empty() && scope.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        is_word.then(|| scope.to_string())
    })
}

fn rewrite_key(path: &Path, key: &str, value: &str) -> Result<(), ConfigError> {
    let content = fs::read(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let updated = replace_value(&content, key, value)
        .ok_or_else(|| ConfigError::key_not_found(key, path.display().to_string()))?;

    write_atomic(path, &updated)
}

/// Replace the value segment of every `key=...` line.
///
/// Works on raw bytes: content need not be UTF-8 and bytes outside the
/// matched value segments are kept as they are. Returns `None` when no
/// line defines `key`. The value is inserted literally (no `$` expansion).
pub fn replace_value(content: &[u8], key: &str, value: &str) -> Option<Vec<u8>> {
    let pattern = Regex::new(&format!(r"(?m)^{}=(?-u:[^\r\n])*", regex::escape(key))).ok()?;
    if !pattern.is_match(content) {
        return None;
    }

    let line = format!("{key}={value}").into_bytes();
    Some(pattern.replace_all(content, NoExpand(&line)).into_owned())
}

/// Replace the file at `path` with `content` via a sibling temp file.
///
/// Symlinks are resolved first so the link stays in place and its target
/// receives the new content.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ConfigError> {
    let write_failed = |source: std::io::Error| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let target = fs::canonicalize(path).map_err(write_failed)?;
    let dir = target.parent().unwrap_or(Path::new("/"));

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(content).map_err(write_failed)?;

    // keep the original mode, NamedTempFile creates files as 0600
    let permissions = fs::metadata(&target).map_err(write_failed)?.permissions();
    tmp.as_file().set_permissions(permissions).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;

    tmp.persist(&target).map_err(|e| write_failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(base: &str, scope_file: Option<(&str, &str)>) -> (TempDir, EnvFileStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), base).unwrap();
        if let Some((name, content)) = scope_file {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = EnvFileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_update_replaces_only_target_line() {
        let (dir, store) = setup(
            "APP_ENV=dev\n",
            Some((".env.dev", "MAINTENANCE_MODE=false\nAPP_DEBUG=1\n")),
        );

        let path = store.update("MAINTENANCE_MODE", "true").unwrap();

        assert_eq!(path, dir.path().join(".env.dev"));
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "MAINTENANCE_MODE=true\nAPP_DEBUG=1\n");
    }

    #[test]
    fn test_update_preserves_comments_and_order() {
        let original = "# gateway settings\n\nOLLAMA_API_URL=http://localhost:11434\nK=v1\n# trailing\nOTHER=x";
        let (dir, store) = setup("APP_ENV=prod\n", Some((".env.prod", original)));

        store.update("K", "v2").unwrap();

        let content = fs::read_to_string(dir.path().join(".env.prod")).unwrap();
        let before: Vec<&str> = original.lines().collect();
        let after: Vec<&str> = content.lines().collect();
        assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(after.iter()) {
            if old.starts_with("K=") {
                assert_eq!(*new, "K=v2");
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn test_update_keeps_crlf_endings() {
        let (dir, store) = setup(
            "APP_ENV=dev\r\n",
            Some((".env.dev", "MAINTENANCE_MODE=false\r\nAPP_DEBUG=1\r\n")),
        );

        store.update("MAINTENANCE_MODE", "true").unwrap();

        let content = fs::read_to_string(dir.path().join(".env.dev")).unwrap();
        assert_eq!(content, "MAINTENANCE_MODE=true\r\nAPP_DEBUG=1\r\n");
    }

    #[test]
    fn test_update_inserts_value_literally() {
        let (dir, store) = setup("APP_ENV=dev\n", Some((".env.dev", "SECRET=old\n")));

        store.update("SECRET", "a$1b${2}").unwrap();

        let content = fs::read_to_string(dir.path().join(".env.dev")).unwrap();
        assert_eq!(content, "SECRET=a$1b${2}\n");
    }

    #[test]
    fn test_update_does_not_match_key_prefix() {
        let (dir, store) = setup(
            "APP_ENV=dev\n",
            Some((".env.dev", "MAINTENANCE_MODE_NOTE=keep\n")),
        );

        let err = store.update("MAINTENANCE_MODE", "true").unwrap_err();

        assert!(matches!(err, ConfigError::KeyNotFound { .. }));
        let content = fs::read_to_string(dir.path().join(".env.dev")).unwrap();
        assert_eq!(content, "MAINTENANCE_MODE_NOTE=keep\n");
    }

    #[test]
    fn test_missing_key_leaves_file_untouched() {
        let original = "APP_DEBUG=1\r\n# comment\nX=1";
        let (dir, store) = setup("APP_ENV=dev\n", Some((".env.dev", original)));

        let err = store.update("MAINTENANCE_MODE", "true").unwrap_err();

        assert!(matches!(err, ConfigError::KeyNotFound { ref key, .. } if key == "MAINTENANCE_MODE"));
        let bytes = fs::read(dir.path().join(".env.dev")).unwrap();
        assert_eq!(bytes, original.as_bytes());
    }

    #[test]
    fn test_missing_scope_key() {
        let (_dir, store) = setup("APP_DEBUG=1\n", None);
        let err = store.update("MAINTENANCE_MODE", "true").unwrap_err();
        assert!(matches!(err, ConfigError::ScopeNotFound { .. }));
    }

    #[test]
    fn test_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvFileStore::new(dir.path());
        let err = store.active_scope().unwrap_err();
        assert!(matches!(err, ConfigError::ScopeNotFound { .. }));
    }

    #[test]
    fn test_missing_scope_file() {
        let (dir, store) = setup("APP_ENV=staging\n", None);
        let err = store.update("MAINTENANCE_MODE", "true").unwrap_err();
        match err {
            ConfigError::FileNotFound { path } => {
                assert_eq!(path, dir.path().join(".env.staging"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gateway.env"), "APP_ENV=test\n").unwrap();
        fs::write(dir.path().join("gateway.env.test"), "MAINTENANCE_MODE=true\n").unwrap();
        let store = EnvFileStore::with_base_file(dir.path(), "gateway.env");

        store.update("MAINTENANCE_MODE", "false").unwrap();

        let content = fs::read_to_string(dir.path().join("gateway.env.test")).unwrap();
        assert_eq!(content, "MAINTENANCE_MODE=false\n");
    }

    #[test]
    fn test_parse_scope_requires_whole_line() {
        assert_eq!(parse_scope("X=1\nAPP_ENV=prod\n"), Some("prod".to_string()));
        assert_eq!(parse_scope("APP_ENV=\n"), None);
        assert_eq!(parse_scope("MY_APP_ENV=dev\n"), None);
        assert_eq!(parse_scope("APP_ENV=dev # note\n"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_update_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = setup("APP_ENV=dev\n", Some((".env.dev", "K=1\n")));
        let path = dir.path().join(".env.dev");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        store.update("K", "2").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
    #[test]
    fn test_update_keeps_non_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "APP_ENV=prod\n").unwrap();
        let scope = dir.path().join(".env.prod");
        fs::write(&scope, b"# caf\xe9\nMAINTENANCE_MODE=false\nNOTE=\xff\xfe\n").unwrap();
        let store = EnvFileStore::new(dir.path());

        store.update("MAINTENANCE_MODE", "true").unwrap();

        assert_eq!(
            fs::read(&scope).unwrap(),
            b"# caf\xe9\nMAINTENANCE_MODE=true\nNOTE=\xff\xfe\n"
        );
    }

    #[test]
    fn test_replace_value_spans_raw_bytes() {
        let updated = replace_value(b"K=\xe9old\r\nX=1\n", "K", "new").unwrap();
        assert_eq!(updated, b"K=new\r\nX=1\n");
        assert!(replace_value(b"KEY=1\n", "K", "2").is_none());
    }

    #[test]
    fn test_unreadable_scope_path_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.prod");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), "K=1\n").unwrap();

        let err = rewrite_key(&path, "K", "2").unwrap_err();

        assert!(matches!(err, ConfigError::ReadFailed { .. }));
        assert_eq!(fs::read(path.join("inner")).unwrap(), b"K=1\n");
    }

    #[test]
    fn test_failed_rename_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file, even as root
        let target = dir.path().join(".env.prod");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "K=1\n").unwrap();

        let err = write_atomic(&target, b"K=2\n").unwrap_err();

        assert!(matches!(err, ConfigError::WriteFailed { .. }));
        assert!(target.is_dir());
        assert_eq!(fs::read(target.join("inner")).unwrap(), b"K=1\n");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temp file should be cleaned up");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(".env.prod");

        let err = write_atomic(&path, b"K=2\n").unwrap_err();

        assert!(matches!(err, ConfigError::WriteFailed { .. }));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_update_writes_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("secrets")).unwrap();
        let real = dir.path().join("secrets").join("prod.env");
        fs::write(&real, "MAINTENANCE_MODE=false\nAPI_TOKEN=abc\n").unwrap();
        fs::write(dir.path().join(".env"), "APP_ENV=prod\n").unwrap();
        let link = dir.path().join(".env.prod");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let store = EnvFileStore::new(dir.path());

        let path = store.update("MAINTENANCE_MODE", "true").unwrap();

        assert_eq!(path, link);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(&real).unwrap(),
            "MAINTENANCE_MODE=true\nAPI_TOKEN=abc\n"
        );
    }

    #[test]
    fn test_parse_scope_is_ascii_only() {
        assert_eq!(parse_scope("APP_ENV=dév\n"), None);
        assert_eq!(parse_scope("APP_ENV=dev_2\n"), Some("dev_2".to_string()));
    }
}
