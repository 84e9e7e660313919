use tracing::{error, trace};

use crate::addrs::{AbsProviderConfig, ResourceInstance};
use crate::graph::{Graph, GraphError, GraphTransformer};
use crate::node::NodeDeposedResourceInstance;
use crate::terraform::State;

/// Adds one vertex per deposed instance recorded in state for the graph's
/// module. `view` limits it to a single resource key and its instances.
pub struct DeposedTransformer<'a> {
    pub state: &'a State,
    pub view: Option<String>,
}

impl GraphTransformer for DeposedTransformer<'_> {
    fn transform(&self, graph: &mut Graph) -> Result<(), GraphError> {
        let Some(module) = self.state.module_by_path(graph.path()) else {
            trace!(path = %graph.path(), "no state for module");
            return Ok(());
        };

        let resources: Vec<_> = match &self.view {
            Some(prefix) => module.view(prefix).collect(),
            None => module.resources.iter().collect(),
        };

        let mut added = Vec::new();
        for (key, rs) in resources {
            if rs.deposed.is_empty() {
                continue;
            }

            let instance = ResourceInstance::parse_state_key(key).map_err(|source| {
                error!(key = %key, error = %source, "invalid resource key in state");
                GraphError::InvalidStateKey {
                    key: key.clone(),
                    source,
                }
            })?;
            let provider = AbsProviderConfig::parse(&rs.provider).map_err(|source| {
                GraphError::InvalidProviderAddress {
                    addr: rs.provider.clone(),
                    source,
                }
            })?;
            let addr = instance.absolute(graph.path().clone());

            for (index, deposed) in rs.deposed.iter().enumerate() {
                if deposed.is_none() {
                    continue;
                }
                trace!(resource = %addr, index, "adding deposed instance");
                added.push(NodeDeposedResourceInstance::new(addr.clone(), index, provider.clone()));
            }
        }

        for node in added {
            graph.add(node.into());
        }
        Ok(())
    }
}
