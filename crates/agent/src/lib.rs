//! The ArchMentor turn pipeline.
//!
//! Every user turn runs through the same staged pipeline:
//!
//! 1. **Classify** the turn into a closed [`ClassificationResult`](archmentor_core::ClassificationResult)
//! 2. **Track** it: update the session's rolling window and derive trend signals
//! 3. **Route** it with the ordered rule list to one of fourteen routes
//! 4. **Plan** which capabilities run, in which stages
//! 5. **Execute** the plan, concurrently where steps are independent
//! 6. **Synthesize** one contract-conforming reply with its metadata block
//! 7. **Score** the turn on the six cognitive metrics and commit the state
//!
//! Sessions are owned by their own tokio tasks ([`SessionManager`]); the
//! [`Runtime`] wires everything together from configuration.

pub mod capabilities;
pub mod classifier;
pub mod executor;
pub mod flags;
pub mod phase;
pub mod pipeline;
pub mod planner;
pub mod routing;
pub mod runtime;
pub mod session;
pub mod synthesizer;
pub mod tracker;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use capabilities::default_registry;
pub use classifier::{ContextClassifier, RuleClassifier};
pub use executor::{ExecutionRequest, Executor};
pub use pipeline::{Explanation, TurnOutcome, TurnPipeline};
pub use routing::RoutingContext;
pub use runtime::Runtime;
pub use session::{SessionHandle, SessionManager};
pub use synthesizer::{Synthesis, SynthesisInput, Synthesizer};
pub use vision::ReferenceVisualAnalyzer;
