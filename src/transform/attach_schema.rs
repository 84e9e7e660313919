use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::addrs::ResourceMode;
use crate::graph::{Graph, GraphError, GraphTransformer};
use crate::schema::ProviderSchema;

/// Attaches the resource type schema from each vertex's provider, so that
/// references are read from configuration the way the provider will see it.
/// `schemas` is keyed by provider type.
pub struct AttachResourceSchemaTransformer<'a> {
    pub schemas: &'a BTreeMap<String, ProviderSchema>,
}

impl GraphTransformer for AttachResourceSchemaTransformer<'_> {
    fn transform(&self, graph: &mut Graph) -> Result<(), GraphError> {
        for vertex in graph.vertices_mut() {
            let name = vertex.name();
            let Some(node) = vertex.as_attach_schema_mut() else {
                continue;
            };
            let provider = node.provider_type();
            let Some(schema) = self.schemas.get(&provider) else {
                trace!(vertex = %name, %provider, "no schema for provider");
                continue;
            };

            let resource = node.resource_addr().resource;
            let block = match resource.mode {
                ResourceMode::Managed => schema.resource_type(&resource.type_name),
                ResourceMode::Data => schema.data_source(&resource.type_name),
            };
            match block {
                Some(block) => {
                    trace!(vertex = %name, "attaching resource schema");
                    node.attach_resource_schema(Arc::new(block.clone()));
                }
                None => trace!(vertex = %name, %provider, "provider has no schema for resource type"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::{InstanceKey, ModuleInstance, Resource};
    use crate::node::{
        NodeAbstractResource, NodeAbstractResourceInstance, NodeResourceInstanceOrphan, Vertex,
    };
    use crate::schema::{Attribute, Block};

    fn schemas() -> BTreeMap<String, ProviderSchema> {
        let mut aws = ProviderSchema::default();
        aws.resource_types.insert(
            "aws_instance".into(),
            Block::default().with_attribute("ami", Attribute::required()),
        );
        aws.data_sources.insert(
            "aws_ami".into(),
            Block::default().with_attribute("owner", Attribute::optional()),
        );
        BTreeMap::from([("aws".to_string(), aws)])
    }

    fn schema_of(v: &Vertex) -> Option<Vec<String>> {
        let schema = match v {
            Vertex::Resource(n) => n.schema.as_ref(),
            Vertex::ResourceInstance(n) => n.base.schema.as_ref(),
            Vertex::Orphan(n) => n.0.base.schema.as_ref(),
            _ => None,
        }?;
        Some(schema.attributes.keys().cloned().collect())
    }

    #[test]
    fn test_attaches_by_provider_and_mode() {
        let root = ModuleInstance::root();
        let mut graph = Graph::new(root.clone());
        graph.add(NodeAbstractResource::new(Resource::managed("aws_instance", "web").absolute(root.clone())).into());
        graph.add(NodeAbstractResource::new(Resource::data("aws_ami", "base").absolute(root.clone())).into());
        graph.add(
            NodeResourceInstanceOrphan::new(NodeAbstractResourceInstance::new(
                Resource::managed("aws_instance", "gone")
                    .instance(InstanceKey::NoKey)
                    .absolute(root.clone()),
            ))
            .into(),
        );
        // Data source schema doesn't apply to a managed resource of the same type.
        graph.add(NodeAbstractResource::new(Resource::managed("aws_ami", "base").absolute(root.clone())).into());
        graph.add(NodeAbstractResource::new(Resource::managed("google_instance", "x").absolute(root)).into());

        let schemas = schemas();
        AttachResourceSchemaTransformer { schemas: &schemas }
            .transform(&mut graph)
            .unwrap();

        let attached: Vec<_> = graph.vertices().iter().map(schema_of).collect();
        assert_eq!(
            attached,
            vec![
                Some(vec!["ami".to_string()]),
                Some(vec!["owner".to_string()]),
                Some(vec!["ami".to_string()]),
                None,
                None,
            ]
        );
    }
}
