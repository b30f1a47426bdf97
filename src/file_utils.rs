use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    /// Find files whose extension matches one of `extensions`, sorted by path.
    ///
    /// Sorting makes every phase independent of directory listing order.
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy();
                if extensions
                    .iter()
                    .any(|wanted| ext.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
                {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Path of `path` relative to `base`, with forward slashes
    pub fn relative_path(path: &Path, base: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(base)
            .map_err(|_| anyhow!("{} is not under {}", path.display(), base.display()))?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Ok(parts.join("/"))
    }

    /// File size in KB, rounded to two decimals
    pub fn file_size_kb<P: AsRef<Path>>(path: P) -> Result<f64> {
        let bytes = fs::metadata(&path)
            .with_context(|| format!("Failed to stat file: {:?}", path.as_ref()))?
            .len();
        Ok(round2(bytes as f64 / 1024.0))
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Write a string so that readers see either the old file or the complete new one.
    ///
    /// The content goes to a temporary file in the destination directory,
    /// which is then renamed over `path`.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush temporary file for {}", path.display()))?;
        temp.persist(path)
            .map_err(|e| anyhow!("Failed to move temporary file into {}: {}", path.display(), e.error))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Round to two decimals, the precision size estimates are reported with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
