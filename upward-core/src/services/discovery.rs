//! Discovery - find `up` scripts in a migrations directory

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;

use crate::domain::result::{Error, Result};

/// Suffix of scripts the engine applies
pub const UP_SUFFIX: &str = ".up.sql";

/// List the `*.up.sql` scripts in `dir`, ordered by file name
///
/// File-name order is the order migrations are applied in. Ids must be
/// fixed-width for that to agree with numeric order.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::discovery(format!(
            "migrations directory not found: {}",
            dir.display()
        )));
    }

    let dir_str = dir
        .to_str()
        .ok_or_else(|| Error::discovery(format!("non UTF-8 path: {}", dir.display())))?;
    let pattern = format!("{}/*{}", Pattern::escape(dir_str), UP_SUFFIX);

    let entries = glob::glob(&pattern).map_err(|e| Error::discovery(e.to_string()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::discovery(e.to_string()))?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!(dir = %dir.display(), count = files.len(), "discovered migration scripts");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "SELECT 1;").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_discover_sorts_by_file_name() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "1548938237_b.up.sql");
        touch(dir.path(), "1548931630_a.up.sql");
        touch(dir.path(), "1549000000_c.up.sql");

        let files = discover(dir.path()).unwrap();
        assert_eq!(
            names(&files),
            vec![
                "1548931630_a.up.sql",
                "1548938237_b.up.sql",
                "1549000000_c.up.sql"
            ]
        );
    }

    #[test]
    fn test_discover_ignores_down_and_other_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "1548931630_a.up.sql");
        touch(dir.path(), "1548931630_a.down.sql");
        touch(dir.path(), "README.md");
        fs::create_dir(dir.path().join("1548999999_dir.up.sql")).unwrap();

        let files = discover(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["1548931630_a.up.sql"]);
    }

    #[test]
    fn test_discover_order_is_lexicographic_not_numeric() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "900.up.sql");
        touch(dir.path(), "1000.up.sql");

        let files = discover(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["1000.up.sql", "900.up.sql"]);
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(discover(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_escapes_glob_characters_in_directory() {
        let dir = tempdir().unwrap();
        let odd = dir.path().join("migs[1]");
        fs::create_dir(&odd).unwrap();
        touch(&odd, "1000.up.sql");

        let files = discover(&odd).unwrap();
        assert_eq!(names(&files), vec!["1000.up.sql"]);
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = tempdir().unwrap();
        let err = discover(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
    }
}
