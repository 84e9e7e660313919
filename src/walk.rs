use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::context::EvalContext;
use crate::error::EvalError;
use crate::eval;
use crate::node::Vertex;

/// The purpose of one graph walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkOperation {
    Input,
    Validate,
    Refresh,
    Plan,
    Apply,
    Destroy,
    Import,
}

impl WalkOperation {
    pub const ALL: [WalkOperation; 7] = [
        Self::Input,
        Self::Validate,
        Self::Refresh,
        Self::Plan,
        Self::Apply,
        Self::Destroy,
        Self::Import,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Validate => "validate",
            Self::Refresh => "refresh",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for WalkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalkOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown walk operation: {s}"))
    }
}

/// Evaluates one vertex's tree in the scope of its module. Vertices that
/// contribute no work succeed immediately.
///
/// Emptied state entries are left in place; call [`EvalContext::finish`]
/// after the last vertex of the walk.
pub async fn walk_vertex(vertex: &Vertex, ctx: &EvalContext) -> Result<(), EvalError> {
    let Some(node) = vertex.as_evalable() else {
        trace!(vertex = %vertex, "nothing to evaluate");
        return Ok(());
    };
    let tree = node.eval_tree();
    let ctx = ctx.with_path(vertex.path().clone());
    eval::eval(&tree, &ctx).await
}
