//! `SOURCE` directive expansion.
//!
//! Flattens a root SQL file into a single document by replacing every include
//! directive with the expanded content of the referenced file. Both the
//! `SOURCE <path>` form and the mysql client short form `\. <path>` are
//! recognized; the path may be quoted and the line may end with `;`.
//!
//! Each inlined file is framed by marker comments naming its canonical path:
//!
//! ```sql
//! -- >>> BEGIN INCLUDE /srv/db/tables/rooms.sql
//! CREATE TABLE rooms (...);
//! -- <<< END INCLUDE /srv/db/tables/rooms.sql
//! ```
//!
//! A file is inlined at most once per expansion. Later directives naming an
//! already visited file contribute nothing, which also makes include cycles
//! terminate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{InitError, Result};

/// Marker written before the content of an inlined file.
pub const BEGIN_MARKER: &str = "-- >>> BEGIN INCLUDE";

/// Marker written after the content of an inlined file.
pub const END_MARKER: &str = "-- <<< END INCLUDE";

/// Marker written in place of an include that could not be resolved.
pub const SKIP_MARKER: &str = "-- !!! SKIPPED INCLUDE";

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*(?:source|\\\.)\s+['"]?([^'";]+?\.sql)['"]?\s*;?\s*$"#)
        .expect("Invalid include directive regex")
});

/// Returns the path named by an include directive, if `line` is one.
///
/// Only paths with a `.sql` extension are accepted so that a column named
/// `source` inside a table definition is never mistaken for a directive.
#[must_use]
pub fn include_target(line: &str) -> Option<&str> {
    INCLUDE_DIRECTIVE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Expands `root` and everything it transitively includes.
///
/// Lines are joined with `\n` regardless of the line endings used by the
/// source files. The root itself must be readable; problems with included
/// files are reported inline with [`SKIP_MARKER`] and never fail the call.
pub fn expand_file(root: &Path) -> Result<String> {
    let root = root
        .canonicalize()
        .map_err(|e| InitError::read_file(root, e))?;

    let mut visited = HashSet::new();
    visited.insert(root.clone());

    let mut lines = Vec::new();
    expand_into(&root, &mut visited, &mut lines)?;
    Ok(lines.join("\n"))
}

fn expand_into(path: &Path, visited: &mut HashSet<PathBuf>, out: &mut Vec<String>) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|e| InitError::read_file(path, e))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    for line in content.lines() {
        let Some(target) = include_target(line) else {
            out.push(line.to_string());
            continue;
        };

        let resolved = match dir.join(target).canonicalize() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(file = %path.display(), include = %target, error = %e, "Skipping include");
                out.push(format!("{SKIP_MARKER} {target}: {e}"));
                continue;
            }
        };

        if !visited.insert(resolved.clone()) {
            debug!(include = %resolved.display(), "Already included, skipping");
            continue;
        }

        let mut nested = Vec::new();
        match expand_into(&resolved, visited, &mut nested) {
            Ok(()) => {
                debug!(include = %resolved.display(), lines = nested.len(), "Inlined include");
                out.push(format!("{BEGIN_MARKER} {}", resolved.display()));
                out.append(&mut nested);
                out.push(format!("{END_MARKER} {}", resolved.display()));
            }
            Err(e) => {
                warn!(file = %path.display(), include = %target, error = %e, "Skipping include");
                out.push(format!("{SKIP_MARKER} {target}: {e}"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn canonical(path: &Path) -> String {
        path.canonicalize().unwrap().display().to_string()
    }

    #[test]
    fn test_include_target_forms() {
        assert_eq!(include_target("SOURCE tables.sql;"), Some("tables.sql"));
        assert_eq!(include_target("  source sub/rooms.sql"), Some("sub/rooms.sql"));
        assert_eq!(include_target("\\. views.sql"), Some("views.sql"));
        assert_eq!(include_target("SOURCE 'quoted file.sql';"), Some("quoted file.sql"));
        assert_eq!(include_target("SOURCE \"dq.sql\" ;  "), Some("dq.sql"));
    }

    #[test]
    fn test_include_target_rejects_non_directives() {
        assert_eq!(include_target("  source VARCHAR(50) NOT NULL,"), None);
        assert_eq!(include_target("-- SOURCE old.sql;"), None);
        assert_eq!(include_target("SELECT 'SOURCE x.sql';"), None);
        assert_eq!(include_target("SOURCEx.sql"), None);
    }

    #[test]
    fn test_no_directives_is_identity() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "init.sql",
            "-- header\r\n\r\nCREATE TABLE a (id INT);\r\nSELECT 1;",
        );

        let expanded = expand_file(&root).unwrap();
        assert_eq!(expanded, "-- header\n\nCREATE TABLE a (id INT);\nSELECT 1;");
    }

    #[test]
    fn test_inlines_in_place_with_markers() {
        let dir = TempDir::new().unwrap();
        let rooms = write(&dir, "tables/rooms.sql", "CREATE TABLE rooms (id INT);");
        let root = write(
            &dir,
            "init.sql",
            "CREATE DATABASE pg;\nSOURCE tables/rooms.sql;\nSELECT 1;",
        );

        let expanded = expand_file(&root).unwrap();
        let rooms = canonical(&rooms);
        assert_eq!(
            expanded,
            format!(
                "CREATE DATABASE pg;\n{BEGIN_MARKER} {rooms}\nCREATE TABLE rooms (id INT);\n{END_MARKER} {rooms}\nSELECT 1;"
            )
        );
    }

    #[test]
    fn test_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "tables/columns.sql", "-- columns");
        write(&dir, "tables/all.sql", "SOURCE columns.sql;");
        let root = write(&dir, "init.sql", "SOURCE tables/all.sql;");

        let expanded = expand_file(&root).unwrap();
        assert!(expanded.contains("-- columns"));
        assert!(!expanded.contains(SKIP_MARKER));
    }

    #[test]
    fn test_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.sql", "SELECT 'a';\nSOURCE b.sql;");
        write(&dir, "b.sql", "SELECT 'b';\nSOURCE a.sql;");

        let expanded = expand_file(&root).unwrap();
        assert_eq!(expanded.matches("SELECT 'a';").count(), 1);
        assert_eq!(expanded.matches("SELECT 'b';").count(), 1);
    }

    #[test]
    fn test_diamond_include_inlined_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "common.sql", "CREATE TABLE owners (id INT);");
        write(&dir, "left.sql", "SOURCE common.sql;");
        write(&dir, "right.sql", "SOURCE common.sql;");
        let root = write(&dir, "init.sql", "SOURCE left.sql;\nSOURCE right.sql;");

        let expanded = expand_file(&root).unwrap();
        assert_eq!(expanded.matches("CREATE TABLE owners").count(), 1);
    }

    #[test]
    fn test_missing_include_is_skipped() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "init.sql", "SELECT 1;\nSOURCE missing.sql;\nSELECT 2;");

        let expanded = expand_file(&root).unwrap();
        let lines: Vec<&str> = expanded.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(&format!("{SKIP_MARKER} missing.sql")));
        assert_eq!(lines[2], "SELECT 2;");
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let result = expand_file(&dir.path().join("nope.sql"));
        assert!(matches!(result, Err(InitError::ReadFile { .. })));
    }
}
