//! Recovering per-question answers from one free-form batched reply.
//!
//! Two tiers. The numbered-segment scan is trusted only when it finds at
//! least as many segments as there are questions; otherwise lines are mapped
//! to questions by position. The positional tier can misalign answers when a
//! model merges or reorders them; that is accepted.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBERED_MARKER: Regex =
        Regex::new(r"^[ \t]*(\*\*)?(\d+)[.:)](\*\*)?[ \t]+").unwrap();
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^(\*\*)?\d+[.:)](\*\*)?([ \t]+|$)").unwrap();
}

const PREAMBLES: &[&str] = &[
    "here are",
    "here is",
    "here's",
    "based on",
    "sure",
    "certainly",
    "of course",
    "the answers",
    "answers:",
];

#[derive(Debug)]
struct Segment {
    number: usize,
    text: String,
}

/// Exactly `question_count` answers, in question order. Never fails.
pub fn parse_answers(raw: &str, question_count: usize) -> Vec<String> {
    if question_count == 0 {
        return Vec::new();
    }

    let segments = numbered_segments(raw);
    if segments.len() >= question_count {
        return align_segments(&segments, question_count);
    }

    tracing::debug!(
        found = segments.len(),
        expected = question_count,
        "numbered parse incomplete, mapping lines by position"
    );
    positional_answers(raw, question_count)
}

fn numbered_segments(raw: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for line in raw.lines() {
        if let Some(caps) = NUMBERED_MARKER.captures(line) {
            let Ok(number) = caps[2].parse::<usize>() else {
                continue;
            };
            let mut text = line[caps[0].len()..].trim().to_string();
            if caps.get(1).is_some() && caps.get(3).is_none() {
                // `**1. Paris**`
                if let Some(stripped) = text.strip_suffix("**") {
                    text = stripped.trim_end().to_string();
                }
            }
            segments.push(Segment { number, text });
        } else if let Some(current) = segments.last_mut() {
            let extra = line.trim();
            if !extra.is_empty() {
                if !current.text.is_empty() {
                    current.text.push('\n');
                }
                current.text.push_str(extra);
            }
        }
    }
    segments
}

fn align_segments(segments: &[Segment], question_count: usize) -> Vec<String> {
    (0..question_count)
        .map(|i| {
            segments
                .iter()
                .find(|s| s.number == i + 1)
                .or_else(|| segments.get(i))
                .map(|s| s.text.clone())
                .unwrap_or_default()
        })
        .collect()
}

/// A preamble prefix only counts as a whole word: "Sure," but not "Surely".
fn is_preamble(line: &str) -> bool {
    let lower = line.to_lowercase();
    PREAMBLES.iter().any(|p| match lower.strip_prefix(p) {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric()),
        None => false,
    })
}

fn positional_answers(raw: &str, question_count: usize) -> Vec<String> {
    let mut lines = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !is_preamble(l))
        .map(|l| LEADING_NUMBER.replace(l, "").trim().to_string());

    (0..question_count)
        .map(|_| lines.next().unwrap_or_default())
        .collect()
}
