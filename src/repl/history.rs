//! Command history persisted in the user's home directory.
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const HISTORY_FILE: &str = ".minisql_history";

/// Location of the history file, falling back to the current directory when
/// no home directory is known.
pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(HISTORY_FILE)
}

/// Appends one input line to the history file, creating it if needed.
///
/// # Errors
/// Returns an `io::Error` if the file cannot be opened or written to.
pub fn append(line: &str, path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", line.trim())?;
    writer.flush()?;
    Ok(())
}

/// Loads the history, newest entry last. A missing or unreadable file is an
/// empty history, not an error.
pub fn load(path: &Path) -> Vec<String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return Vec::new(),
    };

    BufReader::new(file)
        .lines()
        .filter_map(|line| {
            line.ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_append_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        append("insert 1 user1 person1@example.com", path).unwrap();
        append("select", path).unwrap();

        let history = load(path);
        assert_eq!(history, vec!["insert 1 user1 person1@example.com", "select"]);
    }

    #[test]
    fn test_load_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(load(temp_file.path()).is_empty());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let path = PathBuf::from("/nonexistent/path/history");
        assert!(load(&path).is_empty());
    }
}
