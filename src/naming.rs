//! Output naming and collision-free template resolution
//!
//! Produces the extensionless output stem `<title>_<id>[_<suffix>]` for the
//! extraction engine, sanitized for the filesystem, and probes the download
//! directory for a name no existing file already claims. The extension is
//! left to the engine via the `.%(ext)s` placeholder.

use std::path::{Path, PathBuf};

/// Placeholder title used when the sanitized title comes out empty
const UNTITLED: &str = "untitled";

/// Maximum sanitized title length, to respect filesystem name limits
const MAX_TITLE_LEN: usize = 180;

/// Highest numeric suffix tried when resolving name collisions
const MAX_SUFFIX: u32 = 999;

/// Extension placeholder understood by the extraction engine
const EXT_PLACEHOLDER: &str = ".%(ext)s";

/// Sanitize a human title for use in a filename
///
/// Replaces filesystem-hostile characters with `_`, trims surrounding
/// whitespace, and truncates to a bounded length on a char boundary.
/// Blank input yields the literal `"untitled"`.
pub fn sanitize_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | '\n' | '\r' | '\t' | '\0' | '\x0B' | ':' | '*' | '?' | '"' | '<'
            | '>' | '|' => '_',
            other => other,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return UNTITLED.to_string();
    }

    trimmed.chars().take(MAX_TITLE_LEN).collect()
}

/// An extensionless output location: download directory plus file stem
///
/// The stem has the form `<title>_<id>[_<suffix>]`; the engine appends the
/// real extension, so all lookups here match on `<stem>.*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputTemplate {
    dir: PathBuf,
    stem: String,
}

impl OutputTemplate {
    /// Build a template from a title, content id, and optional descriptive suffix
    pub fn new(dir: &Path, title: &str, id: &str, suffix: Option<&str>) -> Self {
        let safe_title = sanitize_title(title);
        let stem = match suffix {
            Some(suffix) => format!("{safe_title}_{id}_{suffix}"),
            None => format!("{safe_title}_{id}"),
        };
        Self {
            dir: dir.to_path_buf(),
            stem,
        }
    }

    /// The extensionless file stem
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The directory the output lands in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render the engine output template, e.g. `/downloads/clip_abc.%(ext)s`
    pub fn engine_template(&self) -> String {
        let mut path = self.dir.join(&self.stem).to_string_lossy().into_owned();
        path.push_str(EXT_PLACEHOLDER);
        path
    }

    /// Whether a directory entry name belongs to this template (`<stem>.<ext>`)
    pub fn matches(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.stem.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Find the most recently modified file in the directory matching this
    /// template, if any
    ///
    /// Used both for normal output resolution (the engine fills in the
    /// extension, so the exact final name is unknown) and as the fallback
    /// discovery after an engine failure.
    pub fn newest_existing(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.dir).ok()?;

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !self.matches(name) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if newest.as_ref().is_none_or(|(best, _)| modified > *best) {
                newest = Some((modified, entry.path()));
            }
        }

        newest.map(|(_, path)| path)
    }

    /// Whether any file in the directory already claims this stem
    fn is_taken(&self) -> bool {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return false;
        };
        entries.flatten().any(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.matches(name))
        })
    }

    fn with_stem(&self, stem: String) -> Self {
        Self {
            dir: self.dir.clone(),
            stem,
        }
    }
}

/// Resolve a collision-free variant of `template`
///
/// If no existing file shares the stem, the candidate is returned as-is.
/// Otherwise `_2`, `_3`, … up to `_999` are probed and the first free name
/// wins. When every candidate is taken the `_999` variant is returned
/// anyway — the download proceeds and may overwrite, a documented
/// limitation of the bounded probe rather than an error.
pub fn ensure_unique(template: OutputTemplate) -> OutputTemplate {
    if !template.is_taken() {
        return template;
    }

    let base = template.stem().to_string();
    for idx in 2..=MAX_SUFFIX {
        let candidate = template.with_stem(format!("{base}_{idx}"));
        if !candidate.is_taken() {
            return candidate;
        }
    }

    tracing::warn!(
        stem = %base,
        "exhausted unique-name candidates, falling back to the last suffix"
    );
    template.with_stem(format!("{base}_{MAX_SUFFIX}"))
}
