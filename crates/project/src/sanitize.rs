use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::ProjectError;

static DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.+").expect("valid dot pattern"));
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid dash pattern"));
static UNDERSCORE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("valid underscore pattern"));

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '(' | ')' | '/' | ' ')
}

/// Maps arbitrary text onto a filesystem-safe path segment.
/// 將任意文字轉為可用於檔案系統的路徑片段。
///
/// Accented characters are decomposed first so that `é` keeps its base `e`,
/// everything outside `[A-Za-z0-9-_.()/ ]` is dropped, boundary spaces are
/// trimmed, inner spaces become `_`, and runs of `.`, `-` and `_` collapse to a
/// single character. The result may be empty or degenerate (`"."`); use
/// [`checked_segment`] wherever the value becomes a directory.
pub fn sanitize_name(input: &str) -> String {
    let filtered: String = input.nfkd().filter(|ch| is_allowed(*ch)).collect();
    let spaced = filtered.trim().replace(' ', "_");
    let collapsed = DOT_RUNS.replace_all(&spaced, ".");
    let collapsed = DASH_RUNS.replace_all(&collapsed, "-");
    UNDERSCORE_RUNS.replace_all(&collapsed, "_").into_owned()
}

/// Sanitizes `input` and rejects results that cannot name a directory below a
/// base path.
/// 清理名稱並拒絕無法作為子目錄的結果（空字串、`.`、`..`）。
///
/// Empty components are dropped so a leading `/` can never turn the segment
/// into an absolute path.
pub fn checked_segment(input: &str) -> Result<String, ProjectError> {
    let sanitized = sanitize_name(input);
    let components: Vec<&str> = sanitized
        .split('/')
        .filter(|component| !component.is_empty())
        .collect();
    if components.is_empty()
        || components
            .iter()
            .any(|component| *component == "." || *component == "..")
    {
        return Err(ProjectError::InvalidName(input.to_string()));
    }
    Ok(components.join("/"))
}

/// Like [`checked_segment`] but for a single file name: nested paths are
/// rejected.
pub fn checked_file_name(input: &str) -> Result<String, ProjectError> {
    let segment = checked_segment(input)?;
    if segment.contains('/') {
        return Err(ProjectError::InvalidName(input.to_string()));
    }
    Ok(segment)
}
