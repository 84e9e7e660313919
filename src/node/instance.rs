use std::fmt;
use std::sync::Arc;

use tracing::error;

use super::resource::legacy_state_references;
use super::{
    AttachResourceConfig, AttachResourceSchema, AttachResourceState, NodeAbstractResource, ProvidedBy, ProviderConsumer,
    ProvisionerConsumer, ReferenceableNode, ReferencerNode, ResourceInstanceNode, ResourceNode,
    SubPath, Targetable,
};
use crate::addrs::{
    AbsProviderConfig, AbsResource, AbsResourceInstance, InstanceKey, ModuleInstance, Reference,
    Referenceable,
};
use crate::configs::ResourceConfig;
use crate::diagnostics::Diagnostic;
use crate::references::dedupe_references;
use crate::schema::Block;
use crate::terraform::ResourceState;

/// One concrete instance of a resource, optionally with its persisted state.
#[derive(Debug, Clone)]
pub struct NodeAbstractResourceInstance {
    pub base: NodeAbstractResource,
    pub key: InstanceKey,
    pub resource_state: Option<ResourceState>,
}

impl NodeAbstractResourceInstance {
    pub fn new(addr: AbsResourceInstance) -> Self {
        Self {
            base: NodeAbstractResource::new(addr.containing_resource()),
            key: addr.resource.key,
            resource_state: None,
        }
    }

    pub fn addr(&self) -> AbsResourceInstance {
        self.base.addr.instance(self.key.clone())
    }

    pub fn config(&self) -> Option<&Arc<ResourceConfig>> {
        self.base.config.as_ref()
    }

    /// Key of this instance inside its module's state.
    pub fn state_key(&self) -> String {
        self.addr().resource.state_key()
    }

    pub fn provider_addr(&self) -> AbsProviderConfig {
        match &self.base.resolved_provider {
            Some(addr) => addr.clone(),
            None => self.provided_by().addr,
        }
    }

    pub fn state_references(&self) -> Vec<String> {
        legacy_state_references(&self.references(), &self.referenceable_addrs(), &self.base.addr)
    }

    fn recorded_references(&self, own: &[Referenceable]) -> Vec<Reference> {
        let Some(rs) = &self.resource_state else {
            return Vec::new();
        };
        let mut refs = Vec::with_capacity(rs.dependencies.len());
        for dep in &rs.dependencies {
            match Reference::parse_legacy(dep) {
                Ok(r) => refs.push(r),
                Err(err) => error!(
                    instance = %self.addr(),
                    dependency = %dep,
                    error = %err,
                    "ignoring invalid dependency recorded in state"
                ),
            }
        }
        dedupe_references(refs, own)
    }
}

impl SubPath for NodeAbstractResourceInstance {
    fn path(&self) -> &ModuleInstance {
        self.base.path()
    }
}

impl ResourceNode for NodeAbstractResourceInstance {
    fn resource_addr(&self) -> AbsResource {
        self.base.addr.clone()
    }
}

impl ResourceInstanceNode for NodeAbstractResourceInstance {
    fn resource_instance_addr(&self) -> AbsResourceInstance {
        self.addr()
    }
}

impl ReferenceableNode for NodeAbstractResourceInstance {
    /// The instance itself, and its resource so that references to the
    /// whole resource reach every instance.
    fn referenceable_addrs(&self) -> Vec<Referenceable> {
        let addr = self.addr();
        vec![
            Referenceable::ResourceInstance(addr.resource.clone()),
            Referenceable::Resource(addr.resource.containing_resource()),
        ]
    }
}

impl ReferencerNode for NodeAbstractResourceInstance {
    /// Configuration wins. Dependencies recorded in state are only used
    /// when no configuration is attached, as for orphans.
    fn references(&self) -> Vec<Reference> {
        let own = self.referenceable_addrs();
        match self.base.config_references(&own) {
            Some(refs) => refs,
            None => self.recorded_references(&own),
        }
    }
}

impl ProviderConsumer for NodeAbstractResourceInstance {
    fn provided_by(&self) -> ProvidedBy {
        if self.base.config.is_some() {
            return self.base.provided_by();
        }

        let Some(rs) = self.resource_state.as_ref().filter(|rs| !rs.provider.is_empty()) else {
            return self.base.provided_by();
        };
        match rs.provider_addr() {
            Ok(addr) => ProvidedBy::exact(addr),
            Err(err) => {
                error!(
                    instance = %self.addr(),
                    provider = %rs.provider,
                    error = %err,
                    "invalid provider address in state"
                );
                let mut guess = self.base.provided_by();
                guess.diagnostics.push(
                    Diagnostic::error("Invalid provider address in state").with_detail(format!(
                        "The state for {} names provider {:?}, which is not a valid provider address: {err}",
                        self.addr(),
                        rs.provider
                    )),
                );
                guess
            }
        }
    }

    fn set_provider(&mut self, addr: AbsProviderConfig) {
        self.base.set_provider(addr);
    }
}

impl ProvisionerConsumer for NodeAbstractResourceInstance {
    fn provisioned_by(&self) -> Vec<String> {
        self.base.provisioned_by()
    }
}

impl AttachResourceConfig for NodeAbstractResourceInstance {
    fn attach_resource_config(&mut self, config: Arc<ResourceConfig>) {
        self.base.attach_resource_config(config);
    }
}

impl AttachResourceSchema for NodeAbstractResourceInstance {
    fn provider_type(&self) -> String {
        self.provider_addr().config.type_name
    }

    fn attach_resource_schema(&mut self, schema: Arc<Block>) {
        self.base.set_schema(schema);
    }
}

impl AttachResourceState for NodeAbstractResourceInstance {
    fn attach_resource_state(&mut self, state: ResourceState) {
        self.resource_state = Some(state);
    }
}

impl Targetable for NodeAbstractResourceInstance {
    fn set_targets(&mut self, targets: Vec<AbsResource>) {
        self.base.set_targets(targets);
    }
}

impl fmt::Display for NodeAbstractResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::{Resource, Traversal};
    use crate::configs::{Body, Expression};

    fn node(key: InstanceKey) -> NodeAbstractResourceInstance {
        NodeAbstractResourceInstance::new(
            Resource::managed("aws_instance", "web")
                .instance(key)
                .absolute(ModuleInstance::root()),
        )
    }

    fn state_with_deps(deps: &[&str]) -> ResourceState {
        let mut rs = ResourceState::new("aws_instance", "provider.aws.east");
        rs.dependencies = deps.iter().map(|d| d.to_string()).collect();
        rs
    }

    #[test]
    fn test_referenceable_as_instance_and_resource() {
        let names: Vec<String> = node(InstanceKey::Int(2))
            .referenceable_addrs()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["aws_instance.web[2]", "aws_instance.web"]);
    }

    #[test]
    fn test_references_fall_back_to_state() {
        let mut n = node(InstanceKey::Int(0));
        n.attach_resource_state(state_with_deps(&[
            "aws_subnet.a",
            "aws_instance.web",
            "aws_instance.web.0",
            "not a valid dependency!",
            "aws_subnet.a",
            "aws_vpc.main",
        ]));
        let refs: Vec<String> = n.references().iter().map(|r| r.subject.to_string()).collect();
        assert_eq!(refs, vec!["aws_subnet.a", "aws_vpc.main"]);
    }

    #[test]
    fn test_config_references_win_over_state() {
        let mut n = node(InstanceKey::NoKey);
        n.attach_resource_state(state_with_deps(&["aws_vpc.old"]));
        let mut rc = ResourceConfig::managed("aws_instance", "web");
        rc.config = Body::default().with_attribute(
            "subnet",
            Expression::Reference(Traversal::parse("aws_subnet.new.id").unwrap()),
        );
        n.attach_resource_config(Arc::new(rc));

        let refs: Vec<String> = n.references().iter().map(|r| r.subject.to_string()).collect();
        assert_eq!(refs, vec!["aws_subnet.new"]);
    }

    #[test]
    fn test_provided_by_state_is_exact() {
        let mut n = node(InstanceKey::NoKey);
        n.attach_resource_state(state_with_deps(&[]));
        let p = n.provided_by();
        assert!(p.exact);
        assert_eq!(p.addr.to_string(), "provider.aws.east");
        assert!(p.diagnostics.is_empty());
        assert_eq!(n.provider_addr().to_string(), "provider.aws.east");
    }

    #[test]
    fn test_provided_by_invalid_state_address_guesses() {
        let mut n = node(InstanceKey::NoKey);
        n.attach_resource_state(ResourceState::new("aws_instance", "aws east"));
        let p = n.provided_by();
        assert!(!p.exact);
        assert_eq!(p.addr.to_string(), "provider.aws");
        assert!(p.diagnostics.has_errors());
    }

    #[test]
    fn test_provided_by_config_beats_state() {
        let mut n = node(InstanceKey::NoKey);
        n.attach_resource_state(state_with_deps(&[]));
        n.attach_resource_config(Arc::new(ResourceConfig::managed("aws_instance", "web")));
        let p = n.provided_by();
        assert!(!p.exact);
        assert_eq!(p.addr.to_string(), "provider.aws");
    }

    #[test]
    fn test_state_key() {
        assert_eq!(node(InstanceKey::Int(3)).state_key(), "aws_instance.web.3");
        assert_eq!(node(InstanceKey::NoKey).state_key(), "aws_instance.web");
    }
}
