//! Plan executor.
//!
//! Runs a coordination plan stage by stage. Steps within a stage have no
//! data dependency on each other and run concurrently; every call is bounded
//! by the capability timeout. A failed or timed-out call becomes a failed
//! contribution and never aborts the turn.

use archmentor_core::capability::{AgentContribution, CapabilityInput, CapabilityRegistry};
use archmentor_core::classification::ClassificationResult;
use archmentor_core::error::CapabilityError;
use archmentor_core::plan::{CoordinationPlan, PlanStep};
use archmentor_core::route::Route;
use archmentor_core::state::ConversationState;
use futures::future::join_all;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The per-turn inputs shared by every step.
#[derive(Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub user_text: &'a str,
    pub image_ref: Option<&'a str>,
    pub classification: &'a ClassificationResult,
    pub state: &'a ConversationState,
    pub route: Route,
}

pub struct Executor {
    registry: CapabilityRegistry,
    timeout: Duration,
}

impl Executor {
    pub fn new(registry: CapabilityRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute every step of the plan. Contributions come back in plan order.
    pub async fn execute(
        &self,
        plan: &CoordinationPlan,
        request: &ExecutionRequest<'_>,
    ) -> Vec<AgentContribution> {
        let mut contributions: Vec<AgentContribution> = Vec::with_capacity(plan.steps.len());

        for (index, stage) in plan.stages().into_iter().enumerate() {
            debug!(
                stage = index,
                roles = ?stage.iter().map(|s| s.role.as_str()).collect::<Vec<_>>(),
                "Running plan stage"
            );
            let results = {
                let upstream = &contributions[..];
                join_all(stage.iter().map(|step| self.run_step(step, request, upstream))).await
            };
            contributions.extend(results);
        }

        contributions.sort_by_key(|c| {
            plan.steps
                .iter()
                .position(|s| s.role == c.role)
                .unwrap_or(usize::MAX)
        });
        contributions
    }

    async fn run_step(
        &self,
        step: &PlanStep,
        request: &ExecutionRequest<'_>,
        upstream: &[AgentContribution],
    ) -> AgentContribution {
        let Some(capability) = self.registry.get(step.role) else {
            let error = CapabilityError::NotRegistered(step.role.as_str().to_string());
            warn!(capability = step.role.as_str(), "Capability not registered");
            return AgentContribution::failure(step.role, &error, 0);
        };

        for dep in &step.depends_on {
            if !upstream.iter().any(|c| c.role == *dep && c.succeeded) {
                debug!(
                    capability = step.role.as_str(),
                    upstream = dep.as_str(),
                    "Running without upstream contribution"
                );
            }
        }

        let input = CapabilityInput {
            user_text: request.user_text,
            image_ref: request.image_ref,
            classification: request.classification,
            state: request.state,
            route: request.route,
            lens: step.lens,
            upstream,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, capability.produce(&input)).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(payload)) => {
                debug!(capability = step.role.as_str(), latency_ms, "Capability succeeded");
                AgentContribution::success(step.role, payload, latency_ms)
            }
            Ok(Err(error)) => {
                warn!(capability = step.role.as_str(), error = %error, "Capability failed");
                AgentContribution::failure(step.role, &error, latency_ms)
            }
            Err(_) => {
                let error = CapabilityError::Timeout {
                    capability: step.role.as_str().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                warn!(capability = step.role.as_str(), error = %error, "Capability timed out");
                AgentContribution::failure(step.role, &error, latency_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner;
    use crate::test_helpers::{FailingCapability, Fixture, SlowCapability, scripted_registry};
    use archmentor_core::capability::{Capability, ContributionPayload};
    use archmentor_core::plan::CapabilityRole;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Reports which upstream roles it could see.
    struct UpstreamReader;

    #[async_trait]
    impl Capability for UpstreamReader {
        fn role(&self) -> CapabilityRole {
            CapabilityRole::Socratic
        }

        async fn produce(
            &self,
            input: &CapabilityInput<'_>,
        ) -> Result<ContributionPayload, CapabilityError> {
            let seen: Vec<&str> = input.upstream.iter().map(|c| c.capability_id.as_str()).collect();
            Ok(ContributionPayload::text(seen.join(",")))
        }
    }

    fn request(fixture: &Fixture, route: Route) -> ExecutionRequest<'_> {
        ExecutionRequest {
            user_text: &fixture.text,
            image_ref: None,
            classification: &fixture.classification,
            state: &fixture.state,
            route,
        }
    }

    #[tokio::test]
    async fn contributions_follow_plan_order() {
        let executor = Executor::new(scripted_registry(), Duration::from_secs(5));
        let fixture = Fixture::new("Feedback on my scheme");
        let plan = planner::plan(Route::BalancedGuidance);
        let contributions = executor
            .execute(&plan, &request(&fixture, Route::BalancedGuidance))
            .await;

        let roles: Vec<CapabilityRole> = contributions.iter().map(|c| c.role).collect();
        assert_eq!(roles, plan.roles());
        assert!(contributions.iter().all(|c| c.succeeded));
    }

    #[tokio::test]
    async fn dependent_steps_see_upstream() {
        let registry = scripted_registry().with(Arc::new(UpstreamReader));
        let executor = Executor::new(registry, Duration::from_secs(5));
        let fixture = Fixture::new("help");
        let plan = planner::plan(Route::FoundationalBuilding);
        let contributions = executor
            .execute(&plan, &request(&fixture, Route::FoundationalBuilding))
            .await;

        let socratic = contributions
            .iter()
            .find(|c| c.role == CapabilityRole::Socratic)
            .unwrap();
        assert!(socratic.payload.text.contains("context"));
        assert!(socratic.payload.text.contains("domain_knowledge"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_become_failed_contributions() {
        let registry = scripted_registry().with(Arc::new(SlowCapability {
            role: CapabilityRole::DomainKnowledge,
            delay: Duration::from_secs(60),
        }));
        let executor = Executor::new(registry, Duration::from_secs(30));
        let fixture = Fixture::new("What is thermal mass?");
        let plan = planner::plan(Route::KnowledgeOnly);
        let contributions = executor
            .execute(&plan, &request(&fixture, Route::KnowledgeOnly))
            .await;

        let knowledge = &contributions[1];
        assert!(!knowledge.succeeded);
        assert!(knowledge.error.as_deref().unwrap().contains("timed out"));
        assert!(contributions[0].succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_steps_run_concurrently() {
        let registry = scripted_registry()
            .with(Arc::new(SlowCapability {
                role: CapabilityRole::Context,
                delay: Duration::from_secs(10),
            }))
            .with(Arc::new(SlowCapability {
                role: CapabilityRole::DomainKnowledge,
                delay: Duration::from_secs(10),
            }));
        let executor = Executor::new(registry, Duration::from_secs(30));
        let fixture = Fixture::new("What is thermal mass?");
        let plan = planner::plan(Route::KnowledgeOnly);

        let started = tokio::time::Instant::now();
        let contributions = executor
            .execute(&plan, &request(&fixture, Route::KnowledgeOnly))
            .await;
        assert!(contributions.iter().all(|c| c.succeeded));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn missing_and_failing_capabilities_are_reported() {
        let registry = CapabilityRegistry::new()
            .with(Arc::new(FailingCapability(CapabilityRole::Context)));
        let executor = Executor::new(registry, Duration::from_secs(5));
        let fixture = Fixture::new("hello there");
        let plan = planner::plan(Route::ProgressiveOpening);
        let contributions = executor
            .execute(&plan, &request(&fixture, Route::ProgressiveOpening))
            .await;

        assert_eq!(contributions.len(), 2);
        assert!(contributions.iter().all(|c| !c.succeeded));
        assert!(contributions[1].error.as_deref().unwrap().contains("not registered"));
    }
}
