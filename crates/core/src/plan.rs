//! Coordination plans — which capabilities run for a route, and in what order.

use serde::{Deserialize, Serialize};

/// The five specialist capabilities a plan can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityRole {
    Context,
    Analysis,
    DomainKnowledge,
    Socratic,
    CognitiveEnhancement,
}

impl CapabilityRole {
    pub const ALL: [CapabilityRole; 5] = [
        CapabilityRole::Context,
        CapabilityRole::Analysis,
        CapabilityRole::DomainKnowledge,
        CapabilityRole::Socratic,
        CapabilityRole::CognitiveEnhancement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityRole::Context => "context",
            CapabilityRole::Analysis => "analysis",
            CapabilityRole::DomainKnowledge => "domain_knowledge",
            CapabilityRole::Socratic => "socratic",
            CapabilityRole::CognitiveEnhancement => "cognitive_enhancement",
        }
    }

    /// Conflict-resolution rank; lower wins.
    ///
    /// socratic > cognitive_enhancement > domain_knowledge > analysis > context
    pub fn priority(&self) -> u8 {
        match self {
            CapabilityRole::Socratic => 1,
            CapabilityRole::CognitiveEnhancement => 2,
            CapabilityRole::DomainKnowledge => 3,
            CapabilityRole::Analysis => 4,
            CapabilityRole::Context => 5,
        }
    }
}

impl std::fmt::Display for CapabilityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analytical lens assigned to a capability in adaptive-parallel plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lens {
    Contextual,
    Spatial,
    Technical,
    Experiential,
    Critical,
}

impl Lens {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lens::Contextual => "contextual",
            Lens::Spatial => "spatial",
            Lens::Technical => "technical",
            Lens::Experiential => "experiential",
            Lens::Critical => "critical",
        }
    }

    /// Short label used when offering lenses to expand.
    pub fn label(&self) -> &'static str {
        match self {
            Lens::Contextual => "site and context",
            Lens::Spatial => "spatial organization",
            Lens::Technical => "materials and structure",
            Lens::Experiential => "user experience",
            Lens::Critical => "critical assumptions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStyle {
    SingleAgent,
    SequentialMulti,
    AdaptiveParallel,
}

/// One capability invocation within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub role: CapabilityRole,
    /// Roles whose output this step consumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<CapabilityRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<Lens>,
}

/// Ordered capability steps plus the coordination style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationPlan {
    pub steps: Vec<PlanStep>,
    pub style: CoordinationStyle,
}

impl CoordinationPlan {
    /// Roles in plan order.
    pub fn roles(&self) -> Vec<CapabilityRole> {
        self.steps.iter().map(|s| s.role).collect()
    }

    pub fn contains(&self, role: CapabilityRole) -> bool {
        self.steps.iter().any(|s| s.role == role)
    }

    /// Group steps into execution stages.
    ///
    /// Every step in a stage has all of its in-plan dependencies satisfied by
    /// earlier stages, so steps within a stage may run concurrently. Stage
    /// members keep plan order.
    pub fn stages(&self) -> Vec<Vec<&PlanStep>> {
        let mut done: Vec<CapabilityRole> = Vec::new();
        let mut remaining: Vec<&PlanStep> = self.steps.iter().collect();
        let mut stages = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<&PlanStep>, Vec<&PlanStep>) =
                remaining.into_iter().partition(|step| {
                    step.depends_on
                        .iter()
                        .all(|dep| done.contains(dep) || !self.contains(*dep))
                });

            if ready.is_empty() {
                // Dependency cycle: run what is left together.
                stages.push(blocked);
                break;
            }

            done.extend(ready.iter().map(|s| s.role));
            stages.push(ready);
            remaining = blocked;
        }

        stages
    }
}
