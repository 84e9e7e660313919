use std::fmt;
use std::sync::Arc;

use super::{
    AttachResourceConfig, AttachResourceSchema, AttachResourceState, Evalable,
    NodeAbstractResourceInstance, ProvidedBy, ProviderConsumer, ProvisionerConsumer,
    ReferenceableNode, ReferencerNode, ResourceInstanceNode, ResourceNode, SubPath, Targetable,
};
use crate::addrs::{
    AbsProviderConfig, AbsResource, AbsResourceInstance, ModuleInstance, Reference, Referenceable,
};
use crate::configs::ResourceConfig;
use crate::eval::{EvalCheckPreventDestroy, EvalDiffDestroy, EvalNode, EvalReadState, EvalWriteDiff, Slot};
use crate::resource::InstanceInfo;
use crate::schema::Block;
use crate::terraform::ResourceState;

const STATE: Slot = Slot::new("state");
const DIFF: Slot = Slot::new("diff");

/// An instance that exists in state but is no longer declared. The only
/// thing to do with it is plan its destruction.
#[derive(Debug, Clone)]
pub struct NodeResourceInstanceOrphan(pub NodeAbstractResourceInstance);

impl NodeResourceInstanceOrphan {
    pub fn new(instance: NodeAbstractResourceInstance) -> Self {
        Self(instance)
    }

    pub fn addr(&self) -> AbsResourceInstance {
        self.0.addr()
    }
}

impl Evalable for NodeResourceInstanceOrphan {
    fn eval_tree(&self) -> EvalNode {
        let addr = self.addr();
        let info = Arc::new(InstanceInfo::new(&addr));
        let name = self.0.state_key();

        EvalNode::Sequence(vec![
            EvalNode::ReadState(EvalReadState {
                name: name.clone(),
                output: STATE,
            }),
            EvalNode::DiffDestroy(EvalDiffDestroy {
                info,
                state: STATE,
                output: DIFF,
            }),
            EvalNode::CheckPreventDestroy(EvalCheckPreventDestroy {
                config: self.0.config().cloned(),
                addr: addr.to_string(),
                diff: DIFF,
            }),
            EvalNode::WriteDiff(EvalWriteDiff { name, diff: DIFF }),
        ])
    }
}

impl SubPath for NodeResourceInstanceOrphan {
    fn path(&self) -> &ModuleInstance {
        self.0.path()
    }
}

impl ResourceNode for NodeResourceInstanceOrphan {
    fn resource_addr(&self) -> AbsResource {
        self.0.resource_addr()
    }
}

impl ResourceInstanceNode for NodeResourceInstanceOrphan {
    fn resource_instance_addr(&self) -> AbsResourceInstance {
        self.0.resource_instance_addr()
    }
}

impl ReferenceableNode for NodeResourceInstanceOrphan {
    fn referenceable_addrs(&self) -> Vec<Referenceable> {
        self.0.referenceable_addrs()
    }
}

impl ReferencerNode for NodeResourceInstanceOrphan {
    fn references(&self) -> Vec<Reference> {
        self.0.references()
    }
}

impl ProviderConsumer for NodeResourceInstanceOrphan {
    fn provided_by(&self) -> ProvidedBy {
        self.0.provided_by()
    }

    fn set_provider(&mut self, addr: AbsProviderConfig) {
        self.0.set_provider(addr);
    }
}

impl ProvisionerConsumer for NodeResourceInstanceOrphan {
    fn provisioned_by(&self) -> Vec<String> {
        self.0.provisioned_by()
    }
}

impl AttachResourceConfig for NodeResourceInstanceOrphan {
    fn attach_resource_config(&mut self, config: Arc<ResourceConfig>) {
        self.0.attach_resource_config(config);
    }
}

impl AttachResourceSchema for NodeResourceInstanceOrphan {
    fn provider_type(&self) -> String {
        self.0.provider_type()
    }

    fn attach_resource_schema(&mut self, schema: Arc<Block>) {
        self.0.attach_resource_schema(schema);
    }
}

impl AttachResourceState for NodeResourceInstanceOrphan {
    fn attach_resource_state(&mut self, state: ResourceState) {
        self.0.attach_resource_state(state);
    }
}

impl Targetable for NodeResourceInstanceOrphan {
    fn set_targets(&mut self, targets: Vec<AbsResource>) {
        self.0.set_targets(targets);
    }
}

impl fmt::Display for NodeResourceInstanceOrphan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (orphan)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::{InstanceKey, Resource};
    use crate::walk::WalkOperation;

    #[test]
    fn test_orphan_tree_shape() {
        let orphan = NodeResourceInstanceOrphan::new(NodeAbstractResourceInstance::new(
            Resource::managed("aws_instance", "a")
                .instance(InstanceKey::Int(1))
                .absolute(ModuleInstance::root()),
        ));
        let tree = orphan.eval_tree();
        let EvalNode::Sequence(nodes) = &tree else {
            panic!("expected a sequence, got {}", tree.label());
        };
        let labels: Vec<String> = nodes.iter().map(EvalNode::label).collect();
        assert_eq!(
            labels,
            vec![
                "ReadState(aws_instance.a.1) -> state",
                "DiffDestroy(aws_instance.a.1) -> diff",
                "CheckPreventDestroy(aws_instance.a[1])",
                "WriteDiff(aws_instance.a.1) <- diff",
            ]
        );

        // No filters: the same operations run whatever the walk.
        for op in WalkOperation::ALL {
            assert_eq!(tree.for_walk(op).map(|t| t.to_tree().to_string()), Some(tree.to_tree().to_string()));
        }
    }
}
