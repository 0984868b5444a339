use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::{AuditEntry, AuditError, AuditLog};

/// Audit log appending one line per entry to a text file
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = entry.to_line(Local::now().naive_local());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_lines() {
        let dir = TempDir::new().unwrap();
        let log = FileAuditLog::new(dir.path().join("tickets.log"));

        log.record(&AuditEntry::opened(5001)).unwrap();
        log.record(&AuditEntry::closed(5001)).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" OPEN ticket=5001"));
        assert!(lines[1].ends_with(" CLOSE ticket=5001"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let log = FileAuditLog::new(dir.path().join("missing").join("tickets.log"));
        assert!(matches!(
            log.record(&AuditEntry::opened(1)),
            Err(AuditError::Io(_))
        ));
    }
}
