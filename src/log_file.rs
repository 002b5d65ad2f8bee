//! Kestrel log file handling
//!
//! Reads a log, corrects it fully in memory and only then writes the sibling
//! `<stem>_altitude_corrected` file, so a failed correction never leaves partial output.
//! Batch runs walk a single directory level, skip previously corrected files and keep
//! going when one file fails.

use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::correction_pipeline::{correct_document_with_stats, CorrectionMode};
use crate::error::{FixError, FixResult};
use crate::overflow_unwrapper::UnwrapConfig;

pub const CORRECTED_FILE_SUFFIX: &str = "altitude_corrected";

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input_filename: String,
    pub output_filename: String,
    pub fix_type: CorrectionMode,
    pub rows: usize,
    pub wrap_events: usize,
    pub max_wrap_depth: i32,
    pub status: String,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.status == "OK"
    }

    fn failed(input: &Path, fix_type: CorrectionMode, err: &FixError) -> Self {
        FileReport {
            input_filename: file_name(input),
            output_filename: String::new(),
            fix_type,
            rows: 0,
            wrap_events: 0,
            max_wrap_depth: 0,
            status: format!("ERROR: {}", err),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// `dir/log.csv` -> `dir/log_altitude_corrected.csv`
pub fn corrected_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut name = format!("{}_{}", stem, CORRECTED_FILE_SUFFIX);
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

pub fn is_corrected(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(CORRECTED_FILE_SUFFIX))
        .unwrap_or(false)
}

/// Correct one log file and write the result next to it.
pub fn process_log_file(
    path: &Path,
    mode: CorrectionMode,
    config: &UnwrapConfig,
) -> FixResult<FileReport> {
    info!("Processing: {}", file_name(path));

    let text = fs::read_to_string(path).map_err(|e| FixError::io(path, e))?;
    let (corrected, stats) = correct_document_with_stats(&text, mode, config)?;

    let out_path = corrected_path(path);
    fs::write(&out_path, corrected).map_err(|e| FixError::io(&out_path, e))?;

    if !stats.wrap_events.is_empty() {
        info!(
            events = stats.wrap_events.len(),
            max_wrap_depth = stats.max_wrap_depth,
            "unwrapped density altitude overflow"
        );
    }
    debug!("Wrote {} rows to {}", stats.rows, out_path.display());

    Ok(FileReport {
        input_filename: file_name(path),
        output_filename: file_name(&out_path),
        fix_type: mode,
        rows: stats.rows,
        wrap_events: stats.wrap_events.len(),
        max_wrap_depth: stats.max_wrap_depth,
        status: "OK".to_string(),
    })
}

/// Shell-style match supporting `*` and `?`.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut n, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                n += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    backtrack = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Files directly inside `dir` whose names match `pattern`, sorted.
pub fn collect_log_files(dir: &Path, pattern: &str) -> FixResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && matches_pattern(&entry.file_name().to_string_lossy(), pattern)
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Correct every matching log in `dir`.
///
/// Per-file failures are logged and reported; they never stop the batch.
pub fn process_directory(
    dir: &Path,
    pattern: &str,
    mode: CorrectionMode,
    config: &UnwrapConfig,
) -> FixResult<Vec<FileReport>> {
    config.validate()?;
    let files = collect_log_files(dir, pattern)?;
    info!("Found {} log files matching '{}'", files.len(), pattern);

    let mut reports = Vec::new();
    for path in files {
        if is_corrected(&path) {
            info!("Skipping: {}", file_name(&path));
            continue;
        }

        match process_log_file(&path, mode, config) {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("Failed to correct {}: {}", path.display(), e);
                reports.push(FileReport::failed(&path, mode, &e));
            }
        }
    }

    Ok(reports)
}

pub fn write_report(reports: &[FileReport], path: &Path) -> FixResult<()> {
    let mut wtr = Writer::from_path(path)?;
    for report in reports {
        wtr.serialize(report)?;
    }
    wtr.flush().map_err(|e| FixError::io(path, e))?;
    Ok(())
}
