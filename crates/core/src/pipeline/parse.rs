//! Lenient parsing of summarizer answers.
//!
//! Models do not reliably follow output formats, so nothing here fails:
//! unusable answers map to fallbacks.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;

/// Shown when the summarizer produced nothing usable.
pub const NO_COMMENTARY: &str = "No commentary available";

pub const CODE_QUALITY_FALLBACK: &str = "Could not extract description";

/// File types that never count as code.
const NON_CODE_EXTENSIONS: &[&str] = &[
    "xlsx", "png", "jpg", "jpeg", "pdf", "docx", "doc", "txt", "mp4", "mp3", "avi", "pptx",
    "ppt", "csv", "xls",
];

/// Flat `{ ... }` objects. Nested braces are not supported.
static OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// Strip whitespace and one pair of surrounding double quotes.
pub fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Commentary text for a summarizer answer.
pub fn commentary(response: &str) -> String {
    let text = unquote(response);
    if text.is_empty() {
        NO_COMMENTARY.to_string()
    } else {
        text.to_string()
    }
}

/// A file the summarizer picked for review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChoice {
    pub file_name: String,
    pub sha_hash: String,
}

impl FileChoice {
    fn is_code(&self) -> bool {
        let extension = match self.file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return true,
        };
        !NON_CODE_EXTENSIONS.contains(&extension.as_str())
    }
}

/// Pull file choices out of a summarizer answer.
///
/// Every flat JSON object carrying both `file_name` and `sha_hash` string
/// keys is taken, in answer order. Non-code files are dropped and at most
/// `max_files` choices are kept.
pub fn file_choices(response: &str, max_files: usize) -> Vec<FileChoice> {
    let cleaned = response.replace('\'', "");
    OBJECT_RE
        .find_iter(&cleaned)
        .filter_map(|m| serde_json::from_str::<serde_json::Value>(m.as_str()).ok())
        .filter_map(|value| {
            Some(FileChoice {
                file_name: value.get("file_name")?.as_str()?.to_string(),
                sha_hash: value.get("sha_hash")?.as_str()?.to_string(),
            })
        })
        .filter(FileChoice::is_code)
        .take(max_files)
        .collect()
}

#[derive(Debug, Deserialize)]
struct CodeQualityAnswer {
    description: String,
    score: serde_json::Value,
}

/// Description and 0..=100 score from a code-quality answer.
///
/// Anything that does not contain a `{description, score}` object yields
/// the fallback description with score 0.
pub fn code_quality(response: &str) -> (String, u8) {
    let fallback = || (CODE_QUALITY_FALLBACK.to_string(), 0);

    let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) else {
        return fallback();
    };
    if end < start {
        return fallback();
    }

    let Ok(answer) = serde_json::from_str::<CodeQualityAnswer>(&response[start..=end]) else {
        return fallback();
    };

    let score = match &answer.score {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(score) = score.filter(|s| s.is_finite()) else {
        return fallback();
    };

    let description = unquote(&answer.description);
    if description.is_empty() {
        return fallback();
    }

    (description.to_string(), score.round().clamp(0.0, 100.0) as u8)
}
