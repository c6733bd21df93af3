//! Detects source files that silence compiler diagnostics
//! (e.g. `#pragma GCC diagnostic ignored "-Wall"`).

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{fsutil, serdable::GlobPattern};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintViolation {
    pub path: PathBuf,
    /// 1-based
    pub line_no: usize,
    pub line: String,
}

impl fmt::Display for LintViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.path.to_string_lossy(),
            self.line_no,
            self.line.trim()
        )
    }
}

pub fn is_suppression_line(line: &str) -> bool {
    line.contains("diagnostic") && line.contains("ignore")
}

pub fn scan_source(path: &Path, source: &str) -> Vec<LintViolation> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| is_suppression_line(line))
        .map(|(i, line)| LintViolation {
            path: path.to_owned(),
            line_no: i + 1,
            line: line.to_owned(),
        })
        .collect()
}

/// Scan files directly under `dir` whose name matches any of `include`.
pub fn scan_dir(
    dir: impl AsRef<Path>,
    include: &[GlobPattern],
) -> fsutil::Result<Vec<LintViolation>> {
    let mut files = fsutil::list_files(&dir)?;
    files.retain(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy())
            .map_or(false, |name| include.iter().any(|pat| pat.matches(&name)))
    });
    files.sort();

    let mut violations = Vec::new();
    for path in files {
        let bytes = std::fs::read(&path)
            .map_err(|e| fsutil::Error::SingleIO("Cannot read file", path.clone(), e))?;
        let source = String::from_utf8_lossy(&bytes);
        violations.extend(scan_source(&path, &source));
    }
    if !violations.is_empty() {
        log::warn!("Found {} diagnostic suppression(s)", violations.len());
    }
    Ok(violations)
}
