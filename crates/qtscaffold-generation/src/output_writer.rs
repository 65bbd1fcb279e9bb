//! Output writer for scaffolded files
//!
//! Confines output paths to the target directory, optionally polishes
//! rendered text and writes it with dry-run and overwrite control.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::ScaffoldError;

static TOO_MANY_LINES_WINDOWS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\r\n){3,}").expect("valid regex"));

static TOO_MANY_LINES_UNIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Configuration for output writing
#[derive(Debug, Clone, Default)]
pub struct OutputWriterConfig {
    /// Whether to run in dry-run mode (preview only)
    pub dry_run: bool,
    /// Whether existing files may be replaced
    pub overwrite: bool,
    /// Whether to polish rendered text before writing
    pub polish_output: bool,
}

/// Result of writing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWriteResult {
    /// Path to the file, inside the target directory
    pub path: PathBuf,
    /// Whether the file was actually written
    pub written: bool,
    /// Whether an existing file was replaced
    pub replaced: bool,
}

/// Resolve `relative` under `target_dir`, refusing anything that leaves it
///
/// `..` may climb back out of a subdirectory it entered but never past
/// `target_dir` itself. Absolute paths and drive prefixes are always
/// rejected. Components that already exist below `target_dir` must not be
/// symlinks, since writing through one could land anywhere on disk.
pub fn resolve_output_path(target_dir: &Path, relative: &Path) -> Result<PathBuf, ScaffoldError> {
    let escape = || ScaffoldError::PathEscapesTarget {
        path: relative.to_path_buf(),
    };

    let mut normalized = PathBuf::new();
    let mut depth = 0usize;

    for component in relative.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return Err(escape()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(escape());
                }
                normalized.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                normalized.push(part);
                depth += 1;
            }
        }
    }

    if depth == 0 {
        return Err(escape());
    }

    let mut resolved = target_dir.to_path_buf();
    for part in normalized.iter() {
        resolved.push(part);
        match fs::symlink_metadata(&resolved) {
            Ok(meta) if meta.file_type().is_symlink() => return Err(escape()),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => break,
            Err(source) => {
                return Err(ScaffoldError::Io {
                    path: resolved,
                    source,
                })
            }
        }
    }

    Ok(target_dir.join(normalized))
}

/// Strip leading whitespace and collapse runs of three or more line breaks
/// into two
pub fn polish_output(contents: &str) -> String {
    let trimmed = contents.trim_start_matches([' ', '\t', '\r', '\n']);
    let windows = TOO_MANY_LINES_WINDOWS.replace_all(trimmed, "\r\n\r\n");
    TOO_MANY_LINES_UNIX
        .replace_all(&windows, "\n\n")
        .into_owned()
}

/// Writes scaffolded files
#[derive(Debug, Clone, Default)]
pub struct OutputWriter {
    config: OutputWriterConfig,
}

impl OutputWriter {
    /// Create a new output writer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new output writer with custom configuration
    pub fn with_config(config: OutputWriterConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &OutputWriterConfig {
        &self.config
    }

    /// Write one file below `target_dir`
    ///
    /// # Arguments
    /// * `target_dir` - Directory every output must stay inside
    /// * `relative` - Output path relative to `target_dir`
    /// * `content` - Rendered text
    ///
    /// # Returns
    /// Where the file went, or the reason nothing was written
    pub fn write(
        &self,
        target_dir: &Path,
        relative: &Path,
        content: &str,
    ) -> Result<FileWriteResult, ScaffoldError> {
        let path = resolve_output_path(target_dir, relative)?;
        let exists = path.exists();

        if exists && !self.config.overwrite {
            return Err(ScaffoldError::AlreadyExists { path });
        }

        if self.config.dry_run {
            debug!(path = %path.display(), "dry run, not writing");
            return Ok(FileWriteResult {
                path,
                written: false,
                replaced: false,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ScaffoldError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = if self.config.polish_output {
            polish_output(content)
        } else {
            content.to_string()
        };

        self.write_file(&path, &content)?;
        debug!(path = %path.display(), bytes = content.len(), "wrote file");

        Ok(FileWriteResult {
            path,
            written: true,
            replaced: exists,
        })
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), ScaffoldError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if self.config.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(path).map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => ScaffoldError::AlreadyExists {
                path: path.to_path_buf(),
            },
            _ => ScaffoldError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        file.write_all(content.as_bytes())
            .map_err(|source| ScaffoldError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_output_path_accepts_nested() {
        let target = Path::new("/work/out");
        assert_eq!(
            resolve_output_path(target, Path::new("src/./main.cpp")).unwrap(),
            PathBuf::from("/work/out/src/main.cpp")
        );
        assert_eq!(
            resolve_output_path(target, Path::new("src/../main.cpp")).unwrap(),
            PathBuf::from("/work/out/main.cpp")
        );
    }

    #[test]
    fn test_resolve_output_path_rejects_escapes() {
        let target = Path::new("/work/out");
        for path in ["../evil.txt", "a/../../evil.txt", "/etc/passwd", "", ".", "a/.."] {
            assert!(
                matches!(
                    resolve_output_path(target, Path::new(path)),
                    Err(ScaffoldError::PathEscapesTarget { .. })
                ),
                "accepted {:?}",
                path
            );
        }
    }

    #[test]
    fn test_polish_output() {
        assert_eq!(polish_output("\n\n  #pragma once\n\n\n\nclass"), "#pragma once\n\nclass");
        assert_eq!(polish_output("a\r\n\r\n\r\nb"), "a\r\n\r\nb");
        assert_eq!(polish_output("a\n\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn test_write_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let writer = OutputWriter::new();

        let result = writer
            .write(temp_dir.path(), Path::new("src/app/main.cpp"), "int main() {}\n")
            .unwrap();

        assert!(result.written);
        assert!(!result.replaced);
        assert_eq!(fs::read_to_string(result.path).unwrap(), "int main() {}\n");
    }

    #[test]
    fn test_existing_file_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.h"), "keep").unwrap();

        let err = OutputWriter::new()
            .write(temp_dir.path(), Path::new("a.h"), "new")
            .unwrap_err();

        assert!(matches!(err, ScaffoldError::AlreadyExists { .. }));
        assert_eq!(fs::read_to_string(temp_dir.path().join("a.h")).unwrap(), "keep");
    }

    #[test]
    fn test_overwrite_replaces() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.h"), "old content").unwrap();

        let writer = OutputWriter::with_config(OutputWriterConfig {
            overwrite: true,
            ..Default::default()
        });
        let result = writer.write(temp_dir.path(), Path::new("a.h"), "new").unwrap();

        assert!(result.replaced);
        assert_eq!(fs::read_to_string(temp_dir.path().join("a.h")).unwrap(), "new");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let writer = OutputWriter::with_config(OutputWriterConfig {
            dry_run: true,
            ..Default::default()
        });

        let result = writer.write(temp_dir.path(), Path::new("dir/a.h"), "x").unwrap();

        assert!(!result.written);
        assert_eq!(result.path, temp_dir.path().join("dir/a.h"));
        assert!(!temp_dir.path().join("dir").exists());
    }

    #[test]
    fn test_polish_applied_when_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let writer = OutputWriter::with_config(OutputWriterConfig {
            polish_output: true,
            ..Default::default()
        });

        writer.write(temp_dir.path(), Path::new("a.h"), "\n\na\n\n\n\nb").unwrap();
        assert_eq!(fs::read_to_string(temp_dir.path().join("a.h")).unwrap(), "a\n\nb");
    }
}
