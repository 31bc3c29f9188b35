//! Contract enforcement engine.
//!
//! The engine checks a reply against the contract for its response type
//! and repairs what it can: compressing to the word ceiling, appending a
//! default question, topping up guided prompts, and normalizing metadata.
//! Repairs are never surfaced to the user; each one is logged as a warning.

use crate::model::{ContractSet, QuestionPolicy, ResponseContract};
use crate::text::{self, ResponseParts};
use archmentor_core::response::ResponseMetadata;
use archmentor_core::route::ResponseType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// A single way a reply broke its contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    Empty,
    WordCeiling { words: usize, limit: usize },
    MissingQuestion,
    TooManyQuestions { found: usize, max: usize },
    TooFewPrompts { found: usize, min: usize },
    TooManyPrompts { found: usize, max: usize },
    MissingChoiceQuestion,
    MissingMetadata { keys: Vec<String> },
    InvalidMetadata { field: String },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Empty => write!(f, "empty reply"),
            Violation::WordCeiling { words, limit } => {
                write!(f, "{words} words exceeds ceiling of {limit}")
            }
            Violation::MissingQuestion => write!(f, "reply does not end with a question"),
            Violation::TooManyQuestions { found, max } => {
                write!(f, "{found} closing questions, at most {max} allowed")
            }
            Violation::TooFewPrompts { found, min } => {
                write!(f, "{found} guided prompts, at least {min} required")
            }
            Violation::TooManyPrompts { found, max } => {
                write!(f, "{found} guided prompts, at most {max} allowed")
            }
            Violation::MissingChoiceQuestion => write!(f, "no explicit choice question"),
            Violation::MissingMetadata { keys } => {
                write!(f, "metadata missing keys: {}", keys.join(", "))
            }
            Violation::InvalidMetadata { field } => write!(f, "metadata field '{field}' invalid"),
        }
    }
}

/// A reply after enforcement.
#[derive(Debug, Clone)]
pub struct Enforced {
    pub parts: ResponseParts,
    /// What was wrong before repair. Empty when the reply was compliant.
    pub violations: Vec<Violation>,
}

impl Enforced {
    pub fn repaired(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn text(&self) -> String {
        self.parts.render()
    }
}

/// An entry in the violation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractLogEntry {
    pub response_type: ResponseType,
    pub violations: Vec<Violation>,
    pub timestamp: DateTime<Utc>,
}

/// Maximum violation log entries kept in memory.
const MAX_CONTRACT_LOG: usize = 5_000;

/// The contract enforcement engine.
///
/// Thread-safe. Holds a [`ContractSet`] and a bounded log of repairs.
pub struct ContractEngine {
    contracts: RwLock<ContractSet>,
    log: RwLock<Vec<ContractLogEntry>>,
}

impl ContractEngine {
    /// Create a new engine with the given contract set.
    pub fn new(contract_set: ContractSet) -> Result<Self, crate::ContractError> {
        contract_set.validate()?;
        Ok(Self {
            contracts: RwLock::new(contract_set),
            log: RwLock::new(Vec::new()),
        })
    }

    /// An engine holding the standard contracts.
    pub fn standard() -> Self {
        Self {
            contracts: RwLock::new(ContractSet::standard()),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Replace the contract set.
    pub fn reload(&self, contract_set: ContractSet) -> Result<(), crate::ContractError> {
        contract_set.validate()?;
        *self.contracts.write().unwrap_or_else(PoisonError::into_inner) = contract_set;
        info!("Response contracts reloaded");
        Ok(())
    }

    pub fn contract_for(&self, response_type: ResponseType) -> Option<ResponseContract> {
        self.contracts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(response_type)
            .cloned()
    }

    pub fn active_count(&self) -> usize {
        self.contracts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active_count()
    }

    /// Check a serialized metadata block for the seven required keys.
    pub fn check_metadata(&self, metadata: &serde_json::Value) -> Vec<Violation> {
        let missing = ResponseMetadata::missing_keys(metadata);
        if missing.is_empty() {
            Vec::new()
        } else {
            vec![Violation::MissingMetadata {
                keys: missing.into_iter().map(String::from).collect(),
            }]
        }
    }

    /// Bring a reply into compliance with its contract.
    pub fn enforce(
        &self,
        parts: ResponseParts,
        response_type: ResponseType,
        checkpoint: bool,
    ) -> Enforced {
        let Some(contract) = self.contract_for(response_type) else {
            return Enforced {
                parts,
                violations: Vec::new(),
            };
        };

        let violations = violations_of(&parts, &contract, checkpoint);
        if violations.is_empty() {
            debug!(response_type = %response_type, "Reply satisfies its contract");
            return Enforced { parts, violations };
        }

        let repaired = repair(parts, &contract, checkpoint);
        let remaining = violations_of(&repaired, &contract, checkpoint);
        if !remaining.is_empty() {
            warn!(
                response_type = %response_type,
                remaining = ?remaining,
                "Reply still violates its contract after repair"
            );
        }

        self.record(response_type, &violations);
        Enforced {
            parts: repaired,
            violations,
        }
    }

    /// Normalize typed metadata: dedupe lists and clamp scores into range.
    pub fn normalize_metadata(&self, metadata: &mut ResponseMetadata) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut seen = BTreeSet::new();
        let before = metadata.agents_used.len();
        metadata.agents_used.retain(|a| seen.insert(a.clone()));
        if metadata.agents_used.len() != before {
            violations.push(Violation::InvalidMetadata {
                field: "agents_used".into(),
            });
        }

        let mut seen = BTreeSet::new();
        let before = metadata.sources.len();
        metadata.sources.retain(|c| seen.insert(c.id.clone()));
        if metadata.sources.len() != before {
            violations.push(Violation::InvalidMetadata {
                field: "sources".into(),
            });
        }

        for (field, value) in [
            ("confidence_score", &mut metadata.confidence_score),
            ("phase_analysis.confidence", &mut metadata.phase_analysis.confidence),
            (
                "phase_analysis.progression_score",
                &mut metadata.phase_analysis.progression_score,
            ),
        ] {
            let current = *value;
            if !current.is_finite() || !(0.0..=1.0).contains(&current) {
                *value = if current.is_finite() { current.clamp(0.0, 1.0) } else { 0.0 };
                violations.push(Violation::InvalidMetadata {
                    field: field.into(),
                });
            }
        }

        if !violations.is_empty() {
            self.record(metadata.response_type, &violations);
        }
        violations
    }

    /// Get the violation log.
    pub fn log(&self) -> Vec<ContractLogEntry> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, response_type: ResponseType, violations: &[Violation]) {
        for v in violations {
            warn!(response_type = %response_type, violation = %v, "Contract violation repaired");
        }
        let mut log = self.log.write().unwrap_or_else(PoisonError::into_inner);
        if log.len() >= MAX_CONTRACT_LOG {
            log.drain(..MAX_CONTRACT_LOG / 10);
        }
        log.push(ContractLogEntry {
            response_type,
            violations: violations.to_vec(),
            timestamp: Utc::now(),
        });
    }
}

fn violations_of(
    parts: &ResponseParts,
    contract: &ResponseContract,
    checkpoint: bool,
) -> Vec<Violation> {
    let mut out = Vec::new();
    if parts.is_empty() {
        out.push(Violation::Empty);
    }

    let words = parts.word_count();
    if words > contract.max_words {
        out.push(Violation::WordCeiling {
            words,
            limit: contract.max_words,
        });
    }

    match contract.question_policy {
        QuestionPolicy::ClosingQuestions { max, .. } => {
            if !checkpoint && parts.questions.is_empty() {
                out.push(Violation::MissingQuestion);
            }
            if parts.questions.len() > max {
                out.push(Violation::TooManyQuestions {
                    found: parts.questions.len(),
                    max,
                });
            }
        }
        QuestionPolicy::GuidedChoice {
            min_prompts,
            max_prompts,
        } => {
            let found = parts.prompts.len();
            if found < min_prompts {
                out.push(Violation::TooFewPrompts {
                    found,
                    min: min_prompts,
                });
            }
            if found > max_prompts {
                out.push(Violation::TooManyPrompts {
                    found,
                    max: max_prompts,
                });
            }
            let ends_with_choice = parts.questions.len() == 1
                && parts.questions.iter().all(|q| text::is_choice_question(q));
            if !ends_with_choice {
                out.push(Violation::MissingChoiceQuestion);
            }
        }
    }
    out
}

fn repair(mut parts: ResponseParts, contract: &ResponseContract, checkpoint: bool) -> ResponseParts {
    match contract.question_policy {
        QuestionPolicy::ClosingQuestions { min, max } => {
            if parts.questions.is_empty() && !checkpoint {
                parts.questions.push(contract.closing_question());
            }
            parts.questions.truncate(max);
            let min_questions = min.min(parts.questions.len());
            fit(&mut parts, contract.max_words, min_questions, 0);
        }
        QuestionPolicy::GuidedChoice {
            min_prompts,
            max_prompts,
        } => {
            let mut defaults = contract.fallback_prompts().into_iter();
            while parts.prompts.len() < min_prompts {
                match defaults.next() {
                    Some(p) if !parts.prompts.contains(&p) => parts.prompts.push(p),
                    Some(_) => {}
                    None => break,
                }
            }
            parts.prompts.truncate(max_prompts);

            // Keep the last choice question; any other trailing question
            // moves back into the body.
            let choice = parts
                .questions
                .iter()
                .rposition(|q| text::is_choice_question(q))
                .map(|i| parts.questions.remove(i))
                .unwrap_or_else(|| contract.closing_question());
            parts.body.append(&mut parts.questions);
            parts.questions.push(choice);
            fit(&mut parts, contract.max_words, 1, min_prompts);
        }
    }

    if parts.is_empty() {
        parts.questions.push(contract.closing_question());
    }
    parts
}

/// Compress the body into whatever the tail leaves, then shed extra
/// questions and prompts down to their minimums.
fn fit(parts: &mut ResponseParts, limit: usize, min_questions: usize, min_prompts: usize) {
    let budget = limit.saturating_sub(parts.tail_words());
    parts.body = text::compress_sentences(&parts.body, budget);

    while parts.word_count() > limit && parts.questions.len() > min_questions.max(1) {
        parts.questions.pop();
    }
    while parts.word_count() > limit && parts.prompts.len() > min_prompts {
        parts.prompts.pop();
    }
    if parts.word_count() > limit {
        let budget = limit.saturating_sub(parts.tail_words());
        parts.body = text::compress_sentences(&parts.body, budget);
    }
}
