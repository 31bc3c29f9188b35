//! Response synthesizer.
//!
//! Merges the turn's contributions into one reply:
//!
//! 1. drop failed contributions
//! 2. order the rest by rank (socratic first, context last)
//! 3. drop statements that repeat an earlier one
//! 4. build body, guided prompts and closing questions for the response type
//! 5. compress the body to the word ceiling, sentence by sentence
//! 6. hand the parts to the contract engine, which repairs anything left over
//! 7. assemble the seven-key metadata block

use archmentor_config::SynthesisConfig;
use archmentor_contracts::text::{self, ResponseParts};
use archmentor_contracts::{ContractEngine, ContractError, ContractSet, Violation};
use archmentor_core::capability::{AgentContribution, Citation};
use archmentor_core::plan::{CoordinationPlan, Lens};
use archmentor_core::response::{PhaseAnalysis, ResponseMetadata, SynthesizedResponse};
use archmentor_core::route::{ResponseType, Route};
use archmentor_core::state::CognitiveFlag;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const DEGRADED_NOTICE: [&str; 2] = [
    "One part of my analysis could not be completed this time, so this answer is narrower than usual.",
    "Ask again if you want me to fill that gap.",
];

const REFLECTION_PROMPT: &str =
    "Before moving on, take a moment to note how your thinking has changed since we started.";

const RECOVERY_STATEMENT: &str =
    "Something went wrong on my side while preparing a response, but your progress is safe.";

const RECOVERY_QUESTION: &str = "Could you share your last point again so we can pick up from there?";

/// Everything the synthesizer reads for one turn.
pub struct SynthesisInput<'a> {
    pub route: Route,
    pub plan: &'a CoordinationPlan,
    /// Contributions in plan order, failed ones included.
    pub contributions: &'a [AgentContribution],
    pub flags: &'a BTreeSet<CognitiveFlag>,
    pub phase: PhaseAnalysis,
    pub decision_confidence: f64,
    /// Reflection checkpoints close with a reflection prompt, not questions.
    pub checkpoint: bool,
}

/// A synthesized reply plus the contract violations repaired on the way.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub response: SynthesizedResponse,
    pub violations: Vec<Violation>,
}

pub struct Synthesizer {
    contracts: Arc<ContractEngine>,
    max_questions: usize,
    dedupe_similarity: f64,
}

impl Synthesizer {
    pub fn new(contracts: Arc<ContractEngine>, config: &SynthesisConfig) -> Self {
        Self {
            contracts,
            max_questions: config.max_questions.max(1),
            dedupe_similarity: config.dedupe_similarity,
        }
    }

    /// Build the contract set from the configured word ceilings and the
    /// optional contract file.
    pub fn from_config(config: &SynthesisConfig) -> Result<Self, ContractError> {
        let contracts = ContractEngine::new(contract_set(config)?)?;
        Ok(Self::new(Arc::new(contracts), config))
    }

    /// Rebuild the contracts from `config`, re-reading the contract file.
    /// The running set is kept when the new one fails to load or validate.
    pub fn reload_contracts(&self, config: &SynthesisConfig) -> Result<usize, ContractError> {
        self.contracts.reload(contract_set(config)?)?;
        Ok(self.contracts.active_count())
    }

    pub fn contracts(&self) -> &Arc<ContractEngine> {
        &self.contracts
    }

    pub fn synthesize(&self, input: &SynthesisInput<'_>) -> Synthesis {
        let response_type = input.route.response_type();

        let mut ranked: Vec<&AgentContribution> =
            input.contributions.iter().filter(|c| c.succeeded).collect();
        ranked.sort_by_key(|c| c.rank);
        let degraded = input.contributions.iter().any(|c| !c.succeeded);

        let mut parts = ResponseParts {
            body: self.body(&ranked, input.route),
            ..Default::default()
        };

        match response_type {
            ResponseType::CognitiveIntervention => {
                parts.prompts = ranked
                    .iter()
                    .find(|c| !c.payload.challenge_prompts.is_empty())
                    .map(|c| c.payload.challenge_prompts.clone())
                    .unwrap_or_default();
                parts.questions = ranked
                    .iter()
                    .flat_map(|c| c.payload.questions.iter())
                    .find(|q| text::is_choice_question(q))
                    .cloned()
                    .into_iter()
                    .collect();
            }
            _ if input.route == Route::MultiAgentComprehensive => {
                let lenses: Vec<Lens> = input
                    .contributions
                    .iter()
                    .filter(|c| c.succeeded)
                    .filter_map(|c| c.payload.lens)
                    .collect();
                parts.questions = lens_choice(&lenses).into_iter().collect();
            }
            _ if input.checkpoint => {}
            _ => parts.questions = self.questions(&ranked),
        }

        let mut reserved: Vec<&str> = Vec::new();
        if degraded {
            reserved.extend(DEGRADED_NOTICE);
        }
        if input.checkpoint && response_type != ResponseType::CognitiveIntervention {
            reserved.push(REFLECTION_PROMPT);
        }

        if let Some(contract) = self.contracts.contract_for(response_type) {
            let reserved_words: usize = reserved.iter().map(|s| text::word_count(s)).sum();
            let budget = contract
                .max_words
                .saturating_sub(parts.tail_words() + reserved_words);
            parts.body = text::compress_sentences(&parts.body, budget);
        }
        parts.body.extend(reserved.iter().map(|s| s.to_string()));

        let enforced = self
            .contracts
            .enforce(parts, response_type, input.checkpoint);
        let mut violations = enforced.violations.clone();

        let mut metadata = ResponseMetadata {
            routing_path: input.route,
            agents_used: input
                .contributions
                .iter()
                .filter(|c| c.succeeded)
                .map(|c| c.capability_id.clone())
                .collect(),
            response_type,
            cognitive_flags: input.flags.iter().copied().collect(),
            sources: input
                .contributions
                .iter()
                .filter(|c| c.succeeded)
                .flat_map(|c| c.payload.citations.iter().cloned())
                .collect::<Vec<Citation>>(),
            phase_analysis: input.phase.clone(),
            confidence_score: input.decision_confidence * success_ratio(input),
        };
        violations.extend(self.contracts.normalize_metadata(&mut metadata));
        self.check_metadata(&metadata);

        debug!(
            route = %input.route,
            response_type = %response_type,
            words = enforced.parts.word_count(),
            repaired = !violations.is_empty(),
            "Reply synthesized"
        );

        Synthesis {
            response: SynthesizedResponse {
                text: enforced.text(),
                response_type,
                metadata,
            },
            violations,
        }
    }

    /// The scripted reply for a turn that could not be served. Carries the
    /// full metadata block like any other reply.
    pub fn recovery(&self, phase: PhaseAnalysis) -> SynthesizedResponse {
        let route = Route::Error;
        let response_type = route.response_type();
        let parts = ResponseParts {
            body: vec![RECOVERY_STATEMENT.to_string()],
            prompts: Vec::new(),
            questions: vec![RECOVERY_QUESTION.to_string()],
        };
        let enforced = self.contracts.enforce(parts, response_type, false);

        let metadata = ResponseMetadata {
            routing_path: route,
            agents_used: Vec::new(),
            response_type,
            cognitive_flags: vec![CognitiveFlag::CapabilityDegraded],
            sources: Vec::new(),
            phase_analysis: phase,
            confidence_score: 0.0,
        };
        self.check_metadata(&metadata);

        SynthesizedResponse {
            text: enforced.text(),
            response_type,
            metadata,
        }
    }

    fn check_metadata(&self, metadata: &ResponseMetadata) {
        match serde_json::to_value(metadata) {
            Ok(value) => {
                for violation in self.contracts.check_metadata(&value) {
                    warn!(violation = %violation, "Response metadata incomplete");
                }
            }
            Err(e) => warn!(error = %e, "Response metadata could not be serialized"),
        }
    }

    /// Statements in rank order with near-duplicates removed. Multi-lens
    /// replies keep one statement per lens.
    fn body(&self, ranked: &[&AgentContribution], route: Route) -> Vec<String> {
        let mut accepted: Vec<String> = Vec::new();
        for contribution in ranked {
            let statements = text::split_sentences(&contribution.payload.text)
                .into_iter()
                .filter(|s| !text::is_question(s));
            let take = if route == Route::MultiAgentComprehensive {
                1
            } else {
                usize::MAX
            };
            for sentence in statements.take(take) {
                if self.is_duplicate(&accepted, &sentence) {
                    debug!(capability = %contribution.capability_id, "Dropped duplicate statement");
                    continue;
                }
                accepted.push(sentence);
            }
        }
        accepted
    }

    /// Closing questions in rank order, deduplicated and capped.
    fn questions(&self, ranked: &[&AgentContribution]) -> Vec<String> {
        let mut accepted: Vec<String> = Vec::new();
        for question in ranked.iter().flat_map(|c| c.payload.questions.iter()) {
            if accepted.len() >= self.max_questions {
                break;
            }
            if text::is_question(question) && !self.is_duplicate(&accepted, question) {
                accepted.push(question.trim().to_string());
            }
        }
        accepted
    }

    fn is_duplicate(&self, accepted: &[String], candidate: &str) -> bool {
        accepted
            .iter()
            .any(|a| text::similarity(a, candidate) >= self.dedupe_similarity)
    }
}

fn success_ratio(input: &SynthesisInput<'_>) -> f64 {
    let planned = input.plan.steps.len();
    if planned == 0 {
        return 1.0;
    }
    let succeeded = input.contributions.iter().filter(|c| c.succeeded).count();
    succeeded as f64 / planned as f64
}

/// "Which would you like to expand: a, b or c?"
fn lens_choice(lenses: &[Lens]) -> Option<String> {
    let labels: Vec<&str> = lenses.iter().map(Lens::label).collect();
    let (last, rest) = labels.split_last()?;
    if rest.is_empty() {
        return Some(format!(
            "Which would you like next, a deeper look at {last} or a new question?"
        ));
    }
    Some(format!(
        "Which would you like to expand: {} or {last}?",
        rest.join(", ")
    ))
}

fn contract_set(config: &SynthesisConfig) -> Result<ContractSet, ContractError> {
    let limits = &config.word_limits;
    let base = ContractSet::with_limits(
        limits.socratic_primary,
        limits.knowledge_support,
        limits.cognitive_intervention,
        limits.synthesis,
        config.max_questions,
    );
    match &config.contracts_path {
        Some(path) => Ok(base.merged(ContractSet::load(Path::new(path))?)),
        None => Ok(base),
    }
}
