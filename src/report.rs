//! Structured view over the synthesized analysis text.
//!
//! The synthesis prompt mandates a fixed section layout and a bracketed
//! score line, but the model owns the actual bytes. This module recovers
//! structure after the fact: the score via a small ladder of patterns
//! (most specific first), the sections via blank-line splitting. When the
//! text does not match the template at all, the whole thing becomes one
//! unstructured section rather than an error — the raw analysis is
//! always presentable.

use crate::prompts::SCORE_LABEL;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// The exact label format the synthesis prompt asks for.
static SCORE_BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Investment Score: \[(\d{1,3})/100\]").unwrap());

/// Older phrasings the model sometimes falls back to.
static SCORE_GLOBAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Score Global: (\d{1,3})/100").unwrap());
static SCORE_PLAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Score: (\d{1,3})/100").unwrap());

/// Last resort: any `NN/100` inside the FINAL ASSESSMENT section.
static SCORE_ANYWHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3})/100").unwrap());

/// One titled block of the memo.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

/// Parsed analysis: extracted score plus titled sections.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// 0–100, absent when no pattern matched or the value was out of
    /// range.
    pub score: Option<u8>,
    pub sections: Vec<ReportSection>,
}

impl AnalysisReport {
    /// Parse the synthesized text into score and sections.
    pub fn parse(text: &str) -> Self {
        AnalysisReport {
            score: extract_score(text),
            sections: split_sections(text),
        }
    }
}

/// Pull the 0–100 investment score out of the analysis text.
///
/// Tries the mandated bracketed form first, then looser phrasings, then
/// any `NN/100` inside the FINAL ASSESSMENT section. Values above 100
/// are rejected as parser noise, not clamped.
pub fn extract_score(text: &str) -> Option<u8> {
    debug_assert!(SCORE_LABEL.starts_with("Investment Score"));

    let candidate = SCORE_BRACKETED
        .captures(text)
        .or_else(|| SCORE_GLOBAL.captures(text))
        .or_else(|| SCORE_PLAIN.captures(text))
        .or_else(|| {
            let (_, tail) = text.split_once("FINAL ASSESSMENT")?;
            SCORE_ANYWHERE.captures(tail)
        })?;

    let value: u16 = candidate[1].parse().ok()?;
    if value > 100 {
        return None;
    }
    Some(value as u8)
}

/// Split into blank-line-delimited blocks; the first line of each block
/// is its title. Text with no blank lines becomes a single "Analysis"
/// section.
fn split_sections(text: &str) -> Vec<ReportSection> {
    let blocks: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect();

    if blocks.len() < 2 {
        let body = text.trim();
        if body.is_empty() {
            return Vec::new();
        }
        return vec![ReportSection {
            title: "Analysis".into(),
            body: body.into(),
        }];
    }

    blocks
        .into_iter()
        .map(|block| match block.split_once('\n') {
            Some((title, body)) => ReportSection {
                title: title.trim().into(),
                body: body.trim().into(),
            },
            None => ReportSection {
                title: block.into(),
                body: String::new(),
            },
        })
        .collect()
}
