//! Quiz output parsing
//!
//! Converts the semi-structured quiz text produced by the model under a
//! strict formatting instruction ("Q:..., A) ..., B) ..., C) ..., D) ...,
//! Answer: <letter>, Explanation: ...") into typed question records.
//!
//! Model output is not guaranteed well-formed, so the parser degrades
//! gracefully: missing options, a missing answer line, a missing explanation,
//! extra whitespace, and out-of-order option letters all yield partial
//! records rather than errors. An answer key pointing at a letter that was
//! never extracted becomes "no known correct answer", not an index.

use crate::types::ParsedQuestion;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const LETTER_ORDER: [char; 4] = ['A', 'B', 'C', 'D'];

static ANSWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Answer:\s*([A-D])").expect("answer pattern is valid"));

/// Parse raw quiz text into ordered question records
///
/// The text is split on the literal `Q:` marker; every non-empty trimmed
/// segment becomes one candidate block, numbered 1-based by its position in
/// the filtered sequence. Blocks whose question text is empty after trimming
/// are dropped entirely.
pub fn parse_quiz_output(raw: &str) -> Vec<ParsedQuestion> {
    let mut questions = Vec::new();

    let chunks = raw
        .split("Q:")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty());

    for (index, chunk) in chunks.enumerate() {
        let sequence = (index + 1) as u32;

        let question_text = match chunk.find("A)") {
            Some(pos) => &chunk[..pos],
            None => chunk,
        };
        let question_text = question_text
            .trim_end_matches(|c| "–-:,. ".contains(c))
            .trim()
            .to_string();
        if question_text.is_empty() {
            continue;
        }

        let option_map = extract_options(chunk);

        // Re-order into fixed A,B,C,D order regardless of generation order;
        // letters with no match are simply omitted.
        let mut options = Vec::new();
        for letter in LETTER_ORDER {
            if let Some(text) = option_map.get(&letter) {
                options.push(text.clone());
            }
        }

        let correct_index = ANSWER_RE
            .captures(chunk)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().chars().next())
            .and_then(|letter| {
                // The answer letter counts only if it was also extracted as
                // an option; correct_index is the letter's position in the
                // canonical A-D order.
                if option_map.contains_key(&letter) {
                    LETTER_ORDER.iter().position(|&l| l == letter)
                } else {
                    None
                }
            });

        let explanation = chunk
            .find("Explanation:")
            .map(|pos| chunk[pos + "Explanation:".len()..].trim().to_string())
            .unwrap_or_default();

        questions.push(ParsedQuestion {
            id: None,
            sequence,
            question: question_text,
            options,
            correct_index,
            explanation,
        });
    }

    questions
}

/// Extract `<Letter>) <text>` options from one question block
///
/// A marker is a letter A-D followed by `)` at the block start or after
/// whitespace. Each option's text runs until the next marker, the `Answer:`
/// marker, or the end of the block. If a letter appears twice, the later
/// occurrence wins.
fn extract_options(chunk: &str) -> HashMap<char, String> {
    let bytes = chunk.as_bytes();
    let mut markers: Vec<(usize, char)> = Vec::new();

    for i in 0..bytes.len().saturating_sub(1) {
        let b = bytes[i];
        if (b'A'..=b'D').contains(&b) && bytes[i + 1] == b')' {
            let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
            if at_boundary {
                markers.push((i, b as char));
            }
        }
    }

    let answer_pos = find_at_boundary(chunk, "Answer:");

    let mut map = HashMap::new();
    for (idx, &(start, letter)) in markers.iter().enumerate() {
        let text_start = start + 2;
        let mut end = markers
            .get(idx + 1)
            .map(|&(next, _)| next)
            .unwrap_or(chunk.len());
        if let Some(pos) = answer_pos {
            if pos > text_start && pos < end {
                end = pos;
            }
        }
        let text = chunk[text_start..end]
            .trim()
            .trim_end_matches(',')
            .trim_end()
            .to_string();
        map.insert(letter, text);
    }

    map
}

/// Find `needle` at the start of the haystack or after whitespace
fn find_at_boundary(haystack: &str, needle: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = haystack[search_from..].find(needle) {
        let pos = search_from + rel;
        if pos == 0 || haystack.as_bytes()[pos - 1].is_ascii_whitespace() {
            return Some(pos);
        }
        search_from = pos + needle.len();
    }
    None
}
