//! Turns a model's loosely formatted text reply into an attribute record.
//!
//! Models wrap JSON inconsistently: sometimes in a ```json fence, sometimes in a bare
//! fence, sometimes not at all. Candidates are tried in that order and the object is cut
//! from the first `{` to the last `}` of whichever candidate holds one.

use crate::{error::PipelineError, models::AttributeRecord};

/// Replies shorter than this (after trimming) cannot hold a usable record.
pub const MIN_USABLE_REPLY_LEN: usize = 10;

pub fn ensure_usable(raw: &str) -> Result<&str, PipelineError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len < MIN_USABLE_REPLY_LEN {
        return Err(PipelineError::EmptyResult { len });
    }
    Ok(trimmed)
}

pub fn sanitize(raw: &str) -> Result<String, PipelineError> {
    let trimmed = raw.trim();
    let candidates = [fenced_block(trimmed, "```json"), fenced_block(trimmed, "```"), Some(trimmed)];

    candidates
        .into_iter()
        .flatten()
        .find_map(object_span)
        .map(str::to_string)
        .ok_or(PipelineError::MalformedResponse)
}

pub fn parse(json_text: &str) -> Result<AttributeRecord, PipelineError> {
    serde_json::from_str(json_text).map_err(|e| PipelineError::Parse(e.to_string()))
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let after = &text[start..];
    let end = after.find("```")?;
    Some(after[..end].trim())
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
