//! Echonade Agents - the lemonade cluster
//!
//! Every agent is described by one declarative [`AgentTemplate`] and built
//! through [`AgentBuilder::build`]; there is no per-agent wiring code. The
//! [`ScriptedReasoner`] stands in for a language-model decision capability
//! and acts on instructions deterministically.

pub mod brain;
pub mod builder;
pub mod roster;
pub mod scenario;
pub mod template;

pub use brain::{JobActions, ScriptedReasoner};
pub use builder::{AgentBuilder, AgentDeps};
pub use roster::{default_roster, CLUSTER};
pub use scenario::{default_scenario, place_orders, register_roster, ScenarioError, ScenarioOrder};
pub use template::AgentTemplate;
