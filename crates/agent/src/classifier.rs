//! Context classifier: turns raw user text into pedagogical signals.
//!
//! The classifier is synchronous and total. It reads the session state but
//! never mutates it, so identical `(text, state)` pairs always classify the
//! same way.

use archmentor_config::ClassifierConfig;
use archmentor_core::classification::{
    ClassificationResult, ConfidenceAssessment, DomainTypeGuess, IntentClarity, InteractionType,
    Level, OffloadingRisk, TurnFeatures,
};
use archmentor_core::state::{ConversationState, DesignPhase};

/// Anything that can classify a user turn.
pub trait ContextClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, user_text: &str, state: &ConversationState) -> ClassificationResult;
}

const STRONG_OFFLOADING: &[&str] = &[
    "just tell me",
    "just give me",
    "give me the answer",
    "tell me the answer",
    "what's the answer",
    "what is the answer",
    "do it for me",
    "design it for me",
    "draw it for me",
    "write it for me",
    "just do it",
    "you decide",
    "pick for me",
    "choose for me",
];

const OFFLOADING: &[&str] = &[
    "tell me what",
    "can you design",
    "can you draw",
    "make it for me",
    "do this for me",
    "what should i use",
    "which should i use",
    "what should i do",
    "the right answer",
    "the best option",
    "solve this",
];

const CONFUSION: &[&str] = &[
    "confused",
    "confusing",
    "i don't understand",
    "i do not understand",
    "don't get",
    "i'm lost",
    "feel lost",
    "unclear",
    "makes no sense",
    "doesn't make sense",
    "struggling",
    "stuck",
    "not sure what",
    "overwhelmed",
];

const KNOWLEDGE: &[&str] = &[
    "what is",
    "what are",
    "what's",
    "how does",
    "how do",
    "explain",
    "define",
    "definition",
    "tell me about",
    "which materials",
    "what materials",
    "examples of",
    "precedents",
    "difference between",
    "how much",
    "how many",
    "rule of thumb",
    "why does",
    "why do",
];

const FEEDBACK: &[&str] = &[
    "feedback",
    "what do you think",
    "thoughts on",
    "review",
    "critique",
    "is this good",
    "does this work",
    "how does my",
    "is my",
    "evaluate",
    "comments on",
    "assess",
];

const EXPLORATION: &[&str] = &[
    "what if",
    "i'm thinking",
    "i am thinking",
    "i was thinking",
    "considering",
    "exploring",
    "explore",
    "maybe",
    "could i",
    "idea",
    "alternative",
    "instead",
    "experiment",
    "i want to try",
    "wondering",
    "i wonder",
];

const TOPIC_CHANGE: &[&str] = &[
    "let's talk about",
    "let's move on",
    "move on to",
    "switch to",
    "change topic",
    "different topic",
    "on another note",
    "moving on",
    "next topic",
    "let's discuss",
    "something else",
];

const OVERCONFIDENT: &[&str] = &[
    "obviously",
    "clearly the best",
    "definitely",
    "perfect",
    "no doubt",
    "certainly",
    "i know exactly",
    "always works",
    "the only way",
    "can't go wrong",
    "flawless",
];

const UNDERCONFIDENT: &[&str] = &[
    "i'm not sure",
    "not sure",
    "i guess",
    "probably wrong",
    "might be wrong",
    "not confident",
    "unsure",
];

const METACOGNITIVE: &[&str] = &[
    "i realize",
    "i realise",
    "i noticed",
    "my reasoning",
    "my thinking",
    "reflecting",
    "in hindsight",
    "i learned",
    "i've learned",
    "i assumed",
    "my assumption",
    "i changed my mind",
    "looking back",
    "my process",
    "i was wrong",
];

const REFLECTION: &[&str] = &[
    "reflect",
    "reflection",
    "summarize my",
    "sum up",
    "what have i learned",
    "how far have i come",
    "recap",
    "my progress",
];

const PROJECT_REFS: &[&str] = &[
    "my",
    "our",
    "i'm designing",
    "i am designing",
    "we're designing",
    "this project",
    "the brief",
];

const FUNDAMENTAL: &[&str] = &[
    "basics",
    "basic",
    "never heard",
    "no idea",
    "from scratch",
    "don't know anything",
    "do not know anything",
    "beginner",
    "complete novice",
    "where do i even start",
    "where do i start",
];

const ACKNOWLEDGEMENTS: &[&str] = &[
    "ok", "okay", "fine", "sure", "whatever", "idk", "yes", "no", "yeah", "nope", "k", "cool",
    "thanks",
];

const CONNECTORS: &[&str] = &[
    "because",
    "since",
    "therefore",
    "so that",
    "which means",
    "however",
    "although",
    "whereas",
    "in order to",
    "as a result",
    "consequently",
    "but",
    "while",
    "instead of",
    "this means",
    "thus",
    "hence",
];

const OPEN_QUESTION_STARTERS: &[&str] = &["why", "how", "what if", "in what way", "to what extent"];

/// Technical vocabulary grouped by topic. A turn's topic is the group with
/// the most distinct hits.
const TOPIC_GROUPS: &[(&str, &[&str])] = &[
    (
        "materials",
        &[
            "material", "materials", "materiality", "timber", "wood", "concrete", "steel", "brick",
            "stone", "glass", "clt", "cladding", "masonry",
        ],
    ),
    (
        "lighting",
        &[
            "daylight", "daylighting", "light", "lighting", "shading", "glare", "skylight",
            "windows",
        ],
    ),
    (
        "circulation",
        &[
            "circulation", "corridor", "corridors", "stair", "stairs", "entrance", "lobby", "ramp",
            "wayfinding", "flow",
        ],
    ),
    (
        "structure",
        &[
            "structure", "structural", "span", "spans", "cantilever", "column", "columns", "beam",
            "beams", "grid", "load", "loads", "foundation",
        ],
    ),
    (
        "site",
        &[
            "site", "context", "orientation", "topography", "neighbourhood", "neighborhood",
            "landscape", "street", "urban",
        ],
    ),
    (
        "program",
        &[
            "program", "programme", "programming", "adjacency", "adjacencies", "zoning", "layout",
            "rooms",
        ],
    ),
    (
        "form",
        &[
            "massing", "form", "volume", "volumes", "parti", "geometry", "facade", "envelope",
            "roof",
        ],
    ),
    (
        "acoustics",
        &["acoustic", "acoustics", "sound", "noise", "reverberation"],
    ),
    (
        "sustainability",
        &[
            "sustainability", "sustainable", "ventilation", "thermal", "energy", "insulation",
            "carbon", "passive", "solar",
        ],
    ),
];

const DOMAIN_TYPES: &[&str] = &[
    "museum",
    "library",
    "school",
    "hospital",
    "housing",
    "residential",
    "office",
    "pavilion",
    "gallery",
    "community centre",
    "community center",
    "theatre",
    "theater",
    "station",
    "market",
    "hotel",
    "clinic",
    "kindergarten",
    "university",
    "stadium",
    "restaurant",
];

const PHASE_CUES: &[(DesignPhase, &[&str])] = &[
    (
        DesignPhase::Discovery,
        &[
            "site analysis", "research", "brief", "user needs", "users", "precedent", "precedents",
            "requirements", "client", "survey",
        ],
    ),
    (
        DesignPhase::Ideation,
        &[
            "concept", "idea", "ideas", "parti", "massing", "options", "alternatives", "diagram",
            "strategy", "zoning", "brainstorm",
        ],
    ),
    (
        DesignPhase::Visualization,
        &[
            "drawing", "drawings", "render", "rendering", "section", "sections", "elevation",
            "elevations", "perspective", "model", "floor plan", "sketch",
        ],
    ),
    (
        DesignPhase::Materialization,
        &[
            "material", "materials", "detail", "details", "detailing", "construction", "facade",
            "assembly", "specification", "joint", "cladding",
        ],
    ),
];

/// Lowercased, tokenized user text with word-boundary cue matching.
struct Cues {
    tokens: Vec<String>,
    padded: String,
    question: bool,
}

impl Cues {
    fn parse(input: &str) -> Self {
        let lowered = input.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
        let tokens: Vec<String> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .map(|t| t.trim_matches('\''))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let padded = format!(" {} ", tokens.join(" "));
        Self {
            tokens,
            padded,
            question: input.contains('?'),
        }
    }

    fn has(&self, cue: &str) -> bool {
        self.padded.contains(&format!(" {cue} "))
    }

    fn any(&self, cues: &[&str]) -> bool {
        cues.iter().any(|c| self.has(c))
    }

    fn count(&self, cues: &[&str]) -> usize {
        cues.iter().filter(|c| self.has(c)).count()
    }

    fn occurrences(&self, word: &str) -> usize {
        self.padded.matches(&format!(" {word} ")).count()
    }

    fn starts_with_any(&self, cues: &[&str]) -> bool {
        cues.iter()
            .any(|c| self.padded.trim_start().starts_with(&format!("{c} ")))
    }
}

/// Cue-list classifier over a fixed architectural vocabulary.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    engagement_low_below: f64,
    engagement_high_above: f64,
    offloading_repeat_at: usize,
}

impl RuleClassifier {
    pub fn new() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            engagement_low_below: config.engagement_low_below,
            engagement_high_above: config.engagement_high_above,
            offloading_repeat_at: config.offloading_repeat_at,
        }
    }

    /// Risky turns still inside the rolling window.
    fn repeats_offloading(&self, state: &ConversationState) -> bool {
        state
            .metrics_window
            .records()
            .filter(|r| r.offloading_risk != OffloadingRisk::None)
            .count()
            >= self.offloading_repeat_at
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextClassifier for RuleClassifier {
    fn name(&self) -> &str {
        "rule"
    }

    fn classify(&self, user_text: &str, state: &ConversationState) -> ClassificationResult {
        if !user_text.chars().any(char::is_alphabetic) {
            return ClassificationResult::unparseable();
        }

        let cues = Cues::parse(user_text);
        let words = cues.tokens.len();

        let strong_offloading = cues.any(STRONG_OFFLOADING);
        let offloading = strong_offloading || cues.any(OFFLOADING);
        let confusion = cues.any(CONFUSION);
        let knowledge = cues.any(KNOWLEDGE);
        let feedback = cues.any(FEEDBACK);
        let exploration = cues.any(EXPLORATION);
        let topic_change = cues.any(TOPIC_CHANGE);
        let project_ref = cues.any(PROJECT_REFS);
        let fundamental_gap = cues.any(FUNDAMENTAL);
        let metacognitive_cues = cues.count(METACOGNITIVE) as u32;
        let connectors = cues.count(CONNECTORS);

        let mut topic: Option<(&str, usize)> = None;
        let mut tech_terms = 0usize;
        for (name, vocabulary) in TOPIC_GROUPS {
            let hits = cues.count(vocabulary);
            tech_terms += hits;
            if hits > 0 && topic.is_none_or(|(_, best)| hits > best) {
                topic = Some((*name, hits));
            }
        }

        // Interaction type: first matching cue family wins.
        let interaction_type = if offloading {
            InteractionType::OffloadingAttempt
        } else if topic_change {
            InteractionType::TopicChange
        } else if confusion {
            InteractionType::ConfusionExpression
        } else if feedback {
            InteractionType::FeedbackRequest
        } else if knowledge {
            InteractionType::KnowledgeRequest
        } else if exploration || tech_terms > 0 {
            InteractionType::DesignExploration
        } else {
            InteractionType::Ambiguous
        };

        let question_sophistication = if cues.question {
            let mut q: f64 = 0.3;
            if cues.starts_with_any(OPEN_QUESTION_STARTERS) || cues.has("what if") {
                q += 0.3;
            }
            if tech_terms > 0 {
                q += 0.2;
            }
            if connectors > 0 {
                q += 0.2;
            }
            q.min(1.0)
        } else if exploration {
            0.3
        } else {
            0.0
        };
        let logical_connections = (connectors as f64 / 3.0).min(1.0);
        let concept_integration = (tech_terms as f64 / 4.0).min(1.0);

        let engagement_score = if words <= 3 && cues.any(ACKNOWLEDGEMENTS) {
            0.1
        } else {
            let mut score = if words >= 3 { 0.3 } else { 0.15 };
            score += (words as f64 / 30.0).min(1.0) * 0.3;
            if cues.question {
                score += 0.15;
            }
            if exploration || metacognitive_cues > 0 {
                score += 0.15;
            }
            score += (tech_terms as f64 / 2.0).min(1.0) * 0.1;
            if offloading {
                score -= 0.25;
            }
            score.clamp(0.0, 1.0)
        };
        let engagement_level = Level::from_score(
            engagement_score,
            self.engagement_low_below,
            self.engagement_high_above,
        );

        let (understanding_level, understanding_grounded) = if confusion || fundamental_gap {
            (Level::Low, true)
        } else if tech_terms >= 3 && (connectors >= 1 || question_sophistication >= 0.6) {
            (Level::High, true)
        } else if tech_terms >= 1 || connectors >= 1 {
            (Level::Medium, true)
        } else {
            (Level::Medium, false)
        };

        let confidence_assessment = if cues.any(OVERCONFIDENT) {
            ConfidenceAssessment::Overconfident
        } else if cues.any(UNDERCONFIDENT) {
            ConfidenceAssessment::Underconfident
        } else {
            ConfidenceAssessment::Calibrated
        };

        let offloading_risk = if strong_offloading {
            OffloadingRisk::High
        } else if offloading {
            if self.repeats_offloading(state) {
                OffloadingRisk::High
            } else {
                OffloadingRisk::Moderate
            }
        } else {
            OffloadingRisk::None
        };

        let intent_clarity = if words < 2
            || (interaction_type == InteractionType::Ambiguous && tech_terms == 0 && connectors == 0)
        {
            IntentClarity::Low
        } else {
            IntentClarity::High
        };

        let domain_type = DOMAIN_TYPES.iter().find(|d| cues.has(d)).map(|name| {
            let mentions = cues.occurrences(name).max(1);
            DomainTypeGuess {
                name: name.to_string(),
                confidence: (0.6 + 0.1 * (mentions - 1) as f64).min(0.9),
            }
        });

        let phase_cues = PHASE_CUES
            .iter()
            .filter_map(|(phase, list)| {
                let n = cues.count(list) as u32;
                (n > 0).then_some((*phase, n))
            })
            .collect();

        ClassificationResult {
            interaction_type,
            understanding_level,
            engagement_level,
            confidence_assessment,
            offloading_risk,
            intent_clarity,
            features: TurnFeatures {
                engagement_score,
                logical_connections,
                concept_integration,
                question_sophistication,
                confusion_detected: confusion,
                fundamental_gap,
                understanding_grounded,
                pure_knowledge: knowledge && !project_ref,
                reflection_requested: cues.any(REFLECTION),
                metacognitive_cues,
                topic: topic.map(|(name, _)| name.to_string()),
                domain_type,
                phase_cues,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmentor_core::message::Message;
    use archmentor_core::state::TurnRecord;

    fn classify(text: &str) -> ClassificationResult {
        RuleClassifier::new().classify(text, &ConversationState::new("t", 10))
    }

    #[test]
    fn unparseable_input_is_conservative() {
        for text in ["", "   ", "?!?", "1234"] {
            let c = classify(text);
            assert_eq!(c, ClassificationResult::unparseable(), "input {text:?}");
        }
    }

    #[test]
    fn strong_offloading_is_high_risk() {
        let c = classify("Just tell me what materials to use");
        assert_eq!(c.interaction_type, InteractionType::OffloadingAttempt);
        assert_eq!(c.offloading_risk, OffloadingRisk::High);
        assert_eq!(c.features.topic.as_deref(), Some("materials"));
    }

    #[test]
    fn repeated_mild_offloading_escalates() {
        let classifier = RuleClassifier::new();
        let fresh = ConversationState::new("t", 10);
        let first = classifier.classify("What should I use for the roof?", &fresh);
        assert_eq!(first.offloading_risk, OffloadingRisk::Moderate);

        let mut state = ConversationState::new("t", 10);
        state.push_message(Message::user("What should I use for the walls?"));
        state.metrics_window.push(TurnRecord::from_classification(1, &first));
        let second = classifier.classify("What should I use for the roof?", &state);
        assert_eq!(second.offloading_risk, OffloadingRisk::High);
    }

    #[test]
    fn offloading_outside_the_window_is_forgotten() {
        let classifier = RuleClassifier::new();
        let mut state = ConversationState::new("t", 2);
        let risky = classifier.classify("What should I use for the walls?", &state);
        state.metrics_window.push(TurnRecord::from_classification(1, &risky));

        let calm = classifier.classify("I'm sketching the entrance sequence", &state);
        assert_eq!(calm.offloading_risk, OffloadingRisk::None);
        state.metrics_window.push(TurnRecord::from_classification(2, &calm));
        state.metrics_window.push(TurnRecord::from_classification(3, &calm));

        let c = classifier.classify("What should I use for the roof?", &state);
        assert_eq!(c.offloading_risk, OffloadingRisk::Moderate);
    }

    #[test]
    fn offloading_repeat_threshold_comes_from_config() {
        let classifier = RuleClassifier::from_config(&ClassifierConfig {
            offloading_repeat_at: 2,
            ..ClassifierConfig::default()
        });
        let mut state = ConversationState::new("t", 10);
        let risky = classifier.classify("What should I use for the walls?", &state);
        state.metrics_window.push(TurnRecord::from_classification(1, &risky));
        let once = classifier.classify("What should I use for the roof?", &state);
        assert_eq!(once.offloading_risk, OffloadingRisk::Moderate);

        state.metrics_window.push(TurnRecord::from_classification(2, &once));
        let twice = classifier.classify("What should I use for the floor?", &state);
        assert_eq!(twice.offloading_risk, OffloadingRisk::High);
    }

    #[test]
    fn confusion_is_grounded_low_understanding() {
        let c = classify("I'm confused about how the circulation should work");
        assert_eq!(c.interaction_type, InteractionType::ConfusionExpression);
        assert_eq!(c.understanding_level, Level::Low);
        assert!(c.features.understanding_grounded);
        assert!(c.has_confusion_signal());
    }

    #[test]
    fn technical_reasoning_is_high_understanding() {
        let c = classify(
            "How does cross-laminated timber compare with concrete for thermal mass in a museum, since daylight and acoustics matter?",
        );
        assert_eq!(c.interaction_type, InteractionType::KnowledgeRequest);
        assert_eq!(c.understanding_level, Level::High);
        assert_ne!(c.engagement_level, Level::Low);
        assert!(c.features.pure_knowledge);
        let domain = c.features.domain_type.expect("domain");
        assert_eq!(domain.name, "museum");
    }

    #[test]
    fn project_reference_is_not_pure_knowledge() {
        let c = classify("What is the best grid for my library?");
        assert_eq!(c.interaction_type, InteractionType::KnowledgeRequest);
        assert!(!c.features.pure_knowledge);
    }

    #[test]
    fn bare_acknowledgement_is_low_engagement() {
        let c = classify("ok");
        assert_eq!(c.engagement_level, Level::Low);
        assert_eq!(c.intent_clarity, IntentClarity::Low);
    }

    #[test]
    fn overconfidence_detected() {
        let c = classify("My facade is obviously perfect, the only way to do it.");
        assert_eq!(c.confidence_assessment, ConfidenceAssessment::Overconfident);
    }

    #[test]
    fn phase_cues_counted() {
        let c = classify("I'm working on the section drawings and the facade details");
        let phases: Vec<DesignPhase> = c.features.phase_cues.iter().map(|(p, _)| *p).collect();
        assert!(phases.contains(&DesignPhase::Visualization));
        assert!(phases.contains(&DesignPhase::Materialization));
    }

    #[test]
    fn curly_apostrophes_are_normalized() {
        let c = classify("I don\u{2019}t understand the structure");
        assert!(c.features.confusion_detected);
    }

    #[test]
    fn classification_is_deterministic() {
        let state = ConversationState::new("t", 10);
        let classifier = RuleClassifier::new();
        let text = "What if the entrance faced the park instead of the street?";
        assert_eq!(
            classifier.classify(text, &state),
            classifier.classify(text, &state)
        );
    }
}
