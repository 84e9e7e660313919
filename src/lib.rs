//! tfeval - resource evaluation core
//!
//! Classifies, enriches and evaluates the resource vertices of an
//! infrastructure dependency graph: per-vertex evaluation trees run against a
//! shared context that owns provider lifecycles and the locked diff and state.

pub mod addrs;
pub mod configs;
pub mod context;
pub mod diagnostics;
pub mod eval;
pub mod graph;
pub mod hook;
pub mod input;
pub mod lang;
pub mod node;
pub mod providers;
pub mod references;
pub mod resource;
pub mod schema;
pub mod terraform;
pub mod transform;
pub mod walk;

mod error;

pub use context::{ContextOptions, EvalContext};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::EvalError;
pub use graph::{Graph, GraphError, GraphTransformer};
pub use node::Vertex;
pub use providers::{ApplyError, ProviderError, ResourceProvider, ResourceProvisioner};
pub use resource::InstanceInfo;
pub use terraform::{Diff, SharedDiff, SharedState, State};
pub use walk::{WalkOperation, walk_vertex};
