//! Coordination planner: which capabilities a route invokes, in what order,
//! and which outputs each step consumes.

use archmentor_core::plan::{CapabilityRole, CoordinationPlan, CoordinationStyle, Lens, PlanStep};
use archmentor_core::route::Route;

use archmentor_core::plan::CapabilityRole::{
    Analysis, CognitiveEnhancement, Context, DomainKnowledge, Socratic,
};

fn step(role: CapabilityRole, depends_on: &[CapabilityRole]) -> PlanStep {
    PlanStep {
        role,
        depends_on: depends_on.to_vec(),
        lens: None,
    }
}

fn lensed(role: CapabilityRole, depends_on: &[CapabilityRole], lens: Lens) -> PlanStep {
    PlanStep {
        lens: Some(lens),
        ..step(role, depends_on)
    }
}

fn plan_of(steps: Vec<PlanStep>) -> CoordinationPlan {
    // Context plus at most one capability is a single-agent plan.
    let style = if steps.len() <= 2 {
        CoordinationStyle::SingleAgent
    } else {
        CoordinationStyle::SequentialMulti
    };
    CoordinationPlan { steps, style }
}

/// The coordination plan for a route. Every non-error plan starts with
/// `context`; ERROR invokes nothing.
pub fn plan(route: Route) -> CoordinationPlan {
    match route {
        Route::Error => CoordinationPlan {
            steps: Vec::new(),
            style: CoordinationStyle::SingleAgent,
        },
        Route::ProgressiveOpening
        | Route::SocraticClarification
        | Route::TopicTransition
        | Route::Fallback => plan_of(vec![step(Context, &[]), step(Socratic, &[Context])]),
        Route::CognitiveIntervention => plan_of(vec![
            step(Context, &[]),
            step(CognitiveEnhancement, &[Context]),
        ]),
        Route::KnowledgeOnly => plan_of(vec![step(Context, &[]), step(DomainKnowledge, &[])]),
        Route::CognitiveChallenge => plan_of(vec![
            step(Context, &[]),
            step(CognitiveEnhancement, &[Context]),
            step(Socratic, &[CognitiveEnhancement]),
        ]),
        Route::SupportiveScaffolding | Route::FoundationalBuilding => plan_of(vec![
            step(Context, &[]),
            step(DomainKnowledge, &[]),
            step(Socratic, &[DomainKnowledge]),
        ]),
        Route::SocraticExploration => plan_of(vec![
            step(Context, &[]),
            step(Analysis, &[Context]),
            step(Socratic, &[Analysis]),
        ]),
        Route::KnowledgeWithChallenge => plan_of(vec![
            step(Context, &[]),
            step(DomainKnowledge, &[]),
            step(CognitiveEnhancement, &[DomainKnowledge]),
        ]),
        Route::BalancedGuidance => plan_of(vec![
            step(Context, &[]),
            step(Analysis, &[Context]),
            step(DomainKnowledge, &[]),
            step(Socratic, &[Analysis, DomainKnowledge]),
        ]),
        Route::MultiAgentComprehensive => CoordinationPlan {
            steps: vec![
                lensed(Context, &[], Lens::Contextual),
                lensed(Analysis, &[Context], Lens::Spatial),
                lensed(DomainKnowledge, &[], Lens::Technical),
                lensed(Socratic, &[Context], Lens::Experiential),
                lensed(CognitiveEnhancement, &[Context], Lens::Critical),
            ],
            style: CoordinationStyle::AdaptiveParallel,
        },
    }
}
