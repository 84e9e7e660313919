use tracing::trace;

use crate::addrs::ResourceInstance;
use crate::configs::Config;
use crate::graph::{Graph, GraphError, GraphTransformer};
use crate::node::{AttachResourceState, NodeAbstractResourceInstance, NodeResourceInstanceOrphan};
use crate::terraform::State;

/// Adds an orphan vertex, with its state attached, for every instance in the
/// module's state whose resource is no longer declared.
pub struct OrphanResourceInstanceTransformer<'a> {
    pub config: &'a Config,
    pub state: &'a State,
}

impl GraphTransformer for OrphanResourceInstanceTransformer<'_> {
    fn transform(&self, graph: &mut Graph) -> Result<(), GraphError> {
        let Some(module) = self.state.module_by_path(graph.path()) else {
            return Ok(());
        };
        let declared = self.config.descendent_for_instance(graph.path());

        let mut added = Vec::new();
        for (key, rs) in &module.resources {
            if rs.primary.is_none() {
                continue;
            }
            let instance = ResourceInstance::parse_state_key(key).map_err(|source| {
                GraphError::InvalidStateKey {
                    key: key.clone(),
                    source,
                }
            })?;
            if declared.is_some_and(|c| c.module.resource_by_addr(&instance.resource).is_some()) {
                continue;
            }

            trace!(key = %key, "adding orphan");
            let mut node = NodeAbstractResourceInstance::new(instance.absolute(graph.path().clone()));
            node.attach_resource_state(rs.clone());
            added.push(NodeResourceInstanceOrphan::new(node));
        }

        for node in added {
            graph.add(node.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::ModuleInstance;
    use crate::configs::ResourceConfig;
    use crate::node::Vertex;
    use crate::terraform::{InstanceState, ResourceState};

    #[test]
    fn test_only_undeclared_instances_become_orphans() {
        let mut config = Config::default();
        config.module.add_resource(ResourceConfig::managed("aws_instance", "kept"));

        let mut state = State::default();
        let module = state.add_module(ModuleInstance::root());
        for key in ["aws_instance.kept.0", "aws_instance.gone.0", "aws_instance.gone.1"] {
            let mut rs = ResourceState::new("aws_instance", "provider.aws");
            rs.primary = Some(InstanceState::new(format!("id-{key}")));
            module.resources.insert(key.into(), rs);
        }
        let mut only_deposed = ResourceState::new("aws_instance", "provider.aws");
        only_deposed.deposed.push(Some(InstanceState::new("old")));
        module.resources.insert("aws_instance.replaced".into(), only_deposed);

        let mut graph = Graph::new(ModuleInstance::root());
        OrphanResourceInstanceTransformer {
            config: &config,
            state: &state,
        }
        .transform(&mut graph)
        .unwrap();

        let names: Vec<String> = graph.vertices().iter().map(Vertex::name).collect();
        assert_eq!(
            names,
            vec!["aws_instance.gone[0] (orphan)", "aws_instance.gone[1] (orphan)"]
        );
        let Vertex::Orphan(orphan) = &graph.vertices()[0] else {
            panic!("expected an orphan");
        };
        assert!(orphan.0.resource_state.is_some());
    }
}
