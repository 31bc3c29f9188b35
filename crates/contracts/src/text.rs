//! Sentence and clause utilities used to build, check and repair replies.
//!
//! A reply is rendered as up to three paragraphs: body sentences, numbered
//! guided prompts (one per line) and closing questions. [`ResponseParts`]
//! parses that layout back, so checking and repairing never need to cut
//! inside a sentence.

use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").expect("static sentence pattern"))
}

fn prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+[.)]\s+(.+)$").expect("static prompt pattern"))
}

fn clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[,;:]\s+").expect("static clause pattern"))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn is_question(sentence: &str) -> bool {
    sentence.trim_end().ends_with('?')
}

/// A question that asks the user to pick between options.
pub fn is_choice_question(sentence: &str) -> bool {
    if !is_question(sentence) {
        return false;
    }
    let lower = sentence.to_lowercase();
    lower.contains(" or ") || lower.starts_with("which") || lower.contains(" which ")
}

/// Split free text into trimmed sentences, keeping terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_re()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

fn terminal(sentence: &str) -> char {
    match sentence.trim_end().chars().last() {
        Some(c @ ('.' | '!' | '?')) => c,
        _ => '.',
    }
}

/// The sentence without its last clause, or `None` when it has only one.
pub fn drop_trailing_clause(sentence: &str) -> Option<String> {
    let last = clause_re().find_iter(sentence).last()?;
    let head = sentence[..last.start()].trim_end();
    if !head.chars().any(char::is_alphanumeric) {
        return None;
    }
    let head = head.trim_end_matches(['.', '!', '?']);
    Some(format!("{head}{}", terminal(sentence)))
}

/// Drop whole sentences from the end, then trailing clauses, until the
/// sentences fit `budget` words. Never cuts inside a clause.
pub fn compress_sentences(sentences: &[String], budget: usize) -> Vec<String> {
    let mut kept: Vec<String> = sentences.to_vec();
    let total = |v: &[String]| v.iter().map(|s| word_count(s)).sum::<usize>();

    while total(&kept) > budget {
        if kept.len() > 1 {
            kept.pop();
            continue;
        }
        match kept.first().and_then(|s| drop_trailing_clause(s)) {
            Some(shorter) => kept[0] = shorter,
            None => {
                kept.clear();
                break;
            }
        }
    }
    kept
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard similarity of the two texts' word sets.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

/// A reply split into body, guided prompts and closing questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseParts {
    pub body: Vec<String>,
    pub prompts: Vec<String>,
    pub questions: Vec<String>,
}

impl ResponseParts {
    /// Parse a rendered reply. Questions are the run of question sentences
    /// at the very end; numbered lines are prompts.
    pub fn parse(text: &str) -> Self {
        let mut parts = ResponseParts::default();
        let mut sentences = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = prompt_re().captures(line) {
                parts.body.append(&mut sentences);
                parts.prompts.push(caps[1].trim().to_string());
            } else {
                sentences.extend(split_sentences(line));
            }
        }

        let split = sentences
            .iter()
            .rposition(|s| !is_question(s))
            .map_or(0, |i| i + 1);
        parts.questions = sentences.split_off(split);
        parts.body.extend(sentences);
        parts
    }

    pub fn render(&self) -> String {
        let mut paragraphs = Vec::new();
        if !self.body.is_empty() {
            paragraphs.push(self.body.join(" "));
        }
        if !self.prompts.is_empty() {
            let lines: Vec<String> = self
                .prompts
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}) {p}", i + 1))
                .collect();
            paragraphs.push(lines.join("\n"));
        }
        if !self.questions.is_empty() {
            paragraphs.push(self.questions.join(" "));
        }
        paragraphs.join("\n\n")
    }

    /// Word count of the rendered reply, numbering included.
    pub fn word_count(&self) -> usize {
        word_count(&self.render())
    }

    /// Words taken by prompts and questions, numbering included.
    pub fn tail_words(&self) -> usize {
        let prompts: usize = self.prompts.iter().map(|p| word_count(p) + 1).sum();
        let questions: usize = self.questions.iter().map(|q| word_count(q)).sum();
        prompts + questions
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.prompts.is_empty() && self.questions.is_empty()
    }
}
