use chatprofile_common::{ProfileError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::pattern::SpeakerPattern;
use crate::types::ExtractionReport;

/// Collects one speaker's messages from a tree of chat exports
#[derive(Debug, Clone)]
pub struct LineExtractor {
    pattern: SpeakerPattern,
    extension: String,
    excluded: Vec<PathBuf>,
}

impl LineExtractor {
    /// Create new extractor for `.txt` exports
    pub fn new(pattern: SpeakerPattern) -> Self {
        Self {
            pattern,
            extension: "txt".to_string(),
            excluded: Vec::new(),
        }
    }

    /// Only read files with this extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Never read these files (the pipeline's own outputs)
    pub fn with_excluded(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excluded.extend(paths);
        self
    }

    /// Speaker pattern in use
    pub fn pattern(&self) -> &SpeakerPattern {
        &self.pattern
    }

    /// Cleaned messages of the speaker, in line order
    pub fn extract_lines(&self, content: &str) -> Vec<String> {
        content
            .lines()
            .filter_map(|line| self.pattern.strip(line))
            .collect()
    }

    /// Cleaned messages of the speaker in one file
    pub fn extract_file(&self, path: &Path) -> Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        Ok(self.extract_lines(&content))
    }

    /// Source files under `dir`, in lexical path order
    pub fn source_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(ProfileError::not_found(format!(
                "Source directory {} does not exist",
                dir.display()
            )));
        }

        let excluded: Vec<PathBuf> = self.excluded.iter().map(|p| normalize(p)).collect();
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().map(|e| e == self.extension.as_str()) != Some(true) {
                continue;
            }
            if excluded.contains(&normalize(path)) {
                debug!("Skipping pipeline output file: {}", path.display());
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Extract every matching line under `dir` into `output`
    ///
    /// The output file is truncated first. A file that cannot be read is
    /// logged and skipped; the walk continues with the next one.
    pub fn extract_directory(&self, dir: &Path, output: &Path) -> Result<ExtractionReport> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| output_error(parent, e))?;
        }

        let output_norm = normalize(output);
        let files: Vec<PathBuf> = self
            .source_files(dir)?
            .into_iter()
            .filter(|path| normalize(path) != output_norm)
            .collect();

        let mut writer = BufWriter::new(File::create(output).map_err(|e| output_error(output, e))?);
        let mut report = ExtractionReport::new(output.to_path_buf());

        for path in files {
            let lines = match self.extract_file(&path) {
                Ok(lines) => lines,
                Err(e) => {
                    warn!("Error processing {}: {}", path.display(), e);
                    report.files_skipped.push(path);
                    continue;
                }
            };

            for line in &lines {
                writeln!(writer, "{}", line).map_err(|e| output_error(output, e))?;
            }

            report.files_processed += 1;
            report.lines_extracted += lines.len();
            info!("Processed: {} ({} lines)", path.display(), lines.len());
        }

        writer.flush().map_err(|e| output_error(output, e))?;

        info!(
            "Profile lines extracted - Files: {}, Skipped: {}, Lines: {}, Output: {}",
            report.files_processed,
            report.files_skipped.len(),
            report.lines_extracted,
            output.display()
        );

        Ok(report)
    }
}

fn output_error(path: &Path, e: std::io::Error) -> ProfileError {
    ProfileError::file_system(format!("Cannot write {}: {}", path.display(), e))
}

/// Absolute, symlink-free form of a path when it exists, absolute otherwise
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}
