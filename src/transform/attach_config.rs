use tracing::trace;

use crate::configs::Config;
use crate::graph::{Graph, GraphError, GraphTransformer};

/// Attaches each resource's declaration to the vertices that accept one.
/// Vertices without a declaration (orphans) are left alone.
pub struct AttachResourceConfigTransformer<'a> {
    pub config: &'a Config,
}

impl GraphTransformer for AttachResourceConfigTransformer<'_> {
    fn transform(&self, graph: &mut Graph) -> Result<(), GraphError> {
        for vertex in graph.vertices_mut() {
            let name = vertex.name();
            let Some(node) = vertex.as_attach_config_mut() else {
                continue;
            };
            let addr = node.resource_addr();

            let Some(module) = self.config.descendent_for_instance(&addr.module) else {
                trace!(vertex = %name, "no configuration for module");
                continue;
            };
            let found = module
                .module
                .managed_resources
                .values()
                .chain(module.module.data_resources.values())
                .find(|rc| rc.addr() == addr.resource);

            match found {
                Some(rc) => {
                    trace!(vertex = %name, "attaching resource configuration");
                    node.attach_resource_config(rc.clone());
                }
                None => trace!(vertex = %name, "no resource configuration to attach"),
            }
        }
        Ok(())
    }
}
