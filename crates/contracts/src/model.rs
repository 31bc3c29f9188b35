//! Contract data model — the shape every response type must satisfy.

use archmentor_core::route::ResponseType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a response must end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionPolicy {
    /// End with between `min` and `max` questions.
    ClosingQuestions { min: usize, max: usize },
    /// Numbered guided prompts, then one explicit choice question.
    GuidedChoice { min_prompts: usize, max_prompts: usize },
}

/// The contract for one response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseContract {
    pub response_type: ResponseType,

    /// Word ceiling for the whole reply.
    pub max_words: usize,

    pub question_policy: QuestionPolicy,

    /// Question appended when a reply ends without one.
    #[serde(default)]
    pub default_question: Option<String>,

    /// Prompts used to top up a guided-choice reply.
    #[serde(default)]
    pub default_prompts: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ResponseContract {
    pub fn new(response_type: ResponseType, max_words: usize, policy: QuestionPolicy) -> Self {
        Self {
            response_type,
            max_words,
            question_policy: policy,
            default_question: None,
            default_prompts: Vec::new(),
            enabled: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.response_type.as_str()
    }

    /// The question to append when one is missing.
    pub fn closing_question(&self) -> String {
        if let Some(q) = &self.default_question {
            return q.clone();
        }
        match self.response_type {
            ResponseType::SocraticPrimary => {
                "What would you test first in your own design, and why?".into()
            }
            ResponseType::KnowledgeSupport => {
                "How would you apply this to the project you are working on?".into()
            }
            ResponseType::CognitiveIntervention => {
                "Which of these would you like to start with, the first or the second?".into()
            }
            ResponseType::Synthesis => "Which of these points would you like to explore next?".into(),
        }
    }

    /// Prompts used to top up a guided-choice reply.
    pub fn fallback_prompts(&self) -> Vec<String> {
        if !self.default_prompts.is_empty() {
            return self.default_prompts.clone();
        }
        vec![
            "Sketch two different options before choosing one.".into(),
            "List what each option does for the people who will use the space.".into(),
            "Name one site constraint that rules an option out.".into(),
        ]
    }

    /// Validate that the contract is well-formed.
    pub fn validate(&self) -> Result<(), crate::ContractError> {
        let invalid = |reason: &str| crate::ContractError::InvalidContract {
            name: self.name().into(),
            reason: reason.into(),
        };
        if self.max_words == 0 {
            return Err(invalid("max_words must be greater than zero"));
        }
        match self.question_policy {
            QuestionPolicy::ClosingQuestions { min, max } => {
                if min == 0 || min > max {
                    return Err(invalid("closing questions need 1 <= min <= max"));
                }
            }
            QuestionPolicy::GuidedChoice {
                min_prompts,
                max_prompts,
            } => {
                if min_prompts == 0 || min_prompts > max_prompts {
                    return Err(invalid("guided prompts need 1 <= min_prompts <= max_prompts"));
                }
                if self.fallback_prompts().len() < min_prompts {
                    return Err(invalid("not enough default prompts to satisfy min_prompts"));
                }
            }
        }
        Ok(())
    }
}

/// One contract per response type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractSet {
    #[serde(default)]
    pub contracts: Vec<ResponseContract>,
}

impl ContractSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard contracts: 130 / 150 / 160 / 140 words, 1–2 closing
    /// questions, 2–3 guided prompts for interventions.
    pub fn standard() -> Self {
        Self::with_limits(130, 150, 160, 140, 2)
    }

    pub fn with_limits(
        socratic_primary: usize,
        knowledge_support: usize,
        cognitive_intervention: usize,
        synthesis: usize,
        max_questions: usize,
    ) -> Self {
        let closing = QuestionPolicy::ClosingQuestions {
            min: 1,
            max: max_questions.max(1),
        };
        Self {
            contracts: vec![
                ResponseContract::new(ResponseType::SocraticPrimary, socratic_primary, closing),
                ResponseContract::new(ResponseType::KnowledgeSupport, knowledge_support, closing),
                ResponseContract::new(
                    ResponseType::CognitiveIntervention,
                    cognitive_intervention,
                    QuestionPolicy::GuidedChoice {
                        min_prompts: 2,
                        max_prompts: 3,
                    },
                ),
                ResponseContract::new(ResponseType::Synthesis, synthesis, closing),
            ],
        }
    }

    /// Load contracts from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, crate::ContractError> {
        let set: ContractSet = toml::from_str(toml_str)?;
        set.validate()?;
        Ok(set)
    }

    /// Load contracts from a TOML file.
    pub fn load(path: &Path) -> Result<Self, crate::ContractError> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::ContractError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// This set with every contract in `overrides` replacing the one for
    /// its response type.
    pub fn merged(mut self, overrides: ContractSet) -> Self {
        for contract in overrides.contracts {
            self.upsert(contract);
        }
        self
    }

    /// The enabled contract for a response type.
    pub fn get(&self, response_type: ResponseType) -> Option<&ResponseContract> {
        self.contracts
            .iter()
            .find(|c| c.enabled && c.response_type == response_type)
    }

    /// Insert a contract, replacing any existing one for the same type.
    pub fn upsert(&mut self, contract: ResponseContract) {
        self.contracts
            .retain(|c| c.response_type != contract.response_type);
        self.contracts.push(contract);
    }

    pub fn validate(&self) -> Result<(), crate::ContractError> {
        for contract in &self.contracts {
            contract.validate()?;
        }
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.contracts.iter().filter(|c| c.enabled).count()
    }
}
