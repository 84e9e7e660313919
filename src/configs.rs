//! Pre-parsed configuration: the module tree and the resource, provider and
//! provisioner declarations inside it.
//!
//! Parsing the configuration language is not done here; these types load
//! from the JSON rendering of an already-parsed configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::addrs::{ModuleInstance, ProviderConfig, Resource, ResourceMode, Traversal};
use crate::lang::is_unknown;
use crate::schema::Block;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Literal(Value),
    Reference(Traversal),
    Template(Vec<Expression>),
}

impl Expression {
    pub fn traversals(&self) -> Vec<&Traversal> {
        let mut out = Vec::new();
        self.collect_traversals(&mut out);
        out
    }

    fn collect_traversals<'a>(&'a self, out: &mut Vec<&'a Traversal>) {
        match self {
            Self::Literal(_) => {}
            Self::Reference(t) => out.push(t),
            Self::Template(parts) => parts.iter().for_each(|p| p.collect_traversals(out)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub body: Body,
}

/// A configuration body: attribute expressions plus nested blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub attributes: BTreeMap<String, Expression>,
    #[serde(default)]
    pub blocks: Vec<NestedBlock>,
}

impl Body {
    pub fn with_attribute(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.attributes.insert(name.into(), expr);
        self
    }

    /// Traversals in every attribute and nested block. With a schema, only
    /// the attributes and block types it declares are considered.
    pub fn traversals(&self, schema: Option<&Block>) -> Vec<&Traversal> {
        let mut out = Vec::new();
        for (name, expr) in &self.attributes {
            if schema.is_some_and(|s| !s.attributes.contains_key(name)) {
                continue;
            }
            expr.collect_traversals(&mut out);
        }
        for nested in &self.blocks {
            let nested_schema = match schema {
                Some(s) => match s.block_types.get(&nested.type_name) {
                    Some(block) => Some(block),
                    None => continue,
                },
                None => None,
            };
            out.extend(nested.body.traversals(nested_schema));
        }
        out
    }

    /// Overlays literal values onto this body. Unknown values never replace
    /// what the body already says.
    pub fn merge_override(&self, values: &BTreeMap<String, Value>) -> Body {
        let mut merged = self.clone();
        for (name, value) in values {
            if is_unknown(value) {
                continue;
            }
            merged
                .attributes
                .insert(name.clone(), Expression::Literal(value.clone()));
        }
        merged
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionerWhen {
    #[default]
    Create,
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provisioner {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub when: ProvisionerWhen,
    #[serde(default)]
    pub connection: Option<Body>,
    #[serde(default)]
    pub config: Body,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedResource {
    #[serde(default)]
    pub prevent_destroy: bool,
    #[serde(default)]
    pub create_before_destroy: bool,
    #[serde(default)]
    pub provisioners: Vec<Provisioner>,
}

fn managed_mode() -> ResourceMode {
    ResourceMode::Managed
}

/// One `resource` or `data` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default = "managed_mode")]
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub count: Option<Expression>,
    #[serde(default)]
    pub for_each: Option<Expression>,
    #[serde(default)]
    pub config: Body,
    #[serde(default)]
    pub depends_on: Vec<Traversal>,
    /// Explicit `provider = aws.east` override.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    /// Only present for managed resources.
    #[serde(default)]
    pub managed: Option<ManagedResource>,
}

impl ResourceConfig {
    pub fn managed(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mode: ResourceMode::Managed,
            type_name: type_name.into(),
            name: name.into(),
            count: None,
            for_each: None,
            config: Body::default(),
            depends_on: Vec::new(),
            provider: None,
            managed: Some(ManagedResource::default()),
        }
    }

    pub fn data(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mode: ResourceMode::Data,
            managed: None,
            ..Self::managed(type_name, name)
        }
    }

    pub fn addr(&self) -> Resource {
        Resource {
            mode: self.mode,
            type_name: self.type_name.clone(),
            name: self.name.clone(),
        }
    }

    pub fn provider_config_addr(&self) -> ProviderConfig {
        self.provider
            .clone()
            .unwrap_or_else(|| ProviderConfig::default_for_resource_type(&self.type_name))
    }

    pub fn prevent_destroy(&self) -> bool {
        self.managed.as_ref().is_some_and(|m| m.prevent_destroy)
    }

    pub fn provisioners(&self) -> &[Provisioner] {
        self.managed
            .as_ref()
            .map_or(&[], |m| m.provisioners.as_slice())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfigBlock {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub config: Body,
}

impl ProviderConfigBlock {
    pub fn addr(&self) -> ProviderConfig {
        ProviderConfig {
            type_name: self.name.clone(),
            alias: self.alias.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawModule {
    #[serde(default)]
    resources: Vec<ResourceConfig>,
    #[serde(default)]
    data: Vec<ResourceConfig>,
    #[serde(default)]
    providers: Vec<ProviderConfigBlock>,
}

/// The declarations of one module, keyed by their relative address.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawModule")]
pub struct Module {
    pub managed_resources: BTreeMap<String, Arc<ResourceConfig>>,
    pub data_resources: BTreeMap<String, Arc<ResourceConfig>>,
    pub provider_configs: BTreeMap<String, Arc<ProviderConfigBlock>>,
}

impl Module {
    pub fn add_resource(&mut self, rc: ResourceConfig) {
        let key = rc.addr().to_string();
        match rc.mode {
            ResourceMode::Managed => self.managed_resources.insert(key, Arc::new(rc)),
            ResourceMode::Data => self.data_resources.insert(key, Arc::new(rc)),
        };
    }

    pub fn add_provider(&mut self, pc: ProviderConfigBlock) {
        let key = pc.addr().to_string();
        self.provider_configs.insert(key, Arc::new(pc));
    }

    pub fn resource_by_addr(&self, addr: &Resource) -> Option<&Arc<ResourceConfig>> {
        let key = addr.to_string();
        match addr.mode {
            ResourceMode::Managed => self.managed_resources.get(&key),
            ResourceMode::Data => self.data_resources.get(&key),
        }
    }

    pub fn provider_config(&self, addr: &ProviderConfig) -> Option<&Arc<ProviderConfigBlock>> {
        self.provider_configs.get(&addr.to_string())
    }
}

impl From<RawModule> for Module {
    fn from(raw: RawModule) -> Self {
        let mut module = Module::default();
        for mut rc in raw.resources {
            rc.mode = ResourceMode::Managed;
            rc.managed.get_or_insert_with(ManagedResource::default);
            module.add_resource(rc);
        }
        for mut rc in raw.data {
            rc.mode = ResourceMode::Data;
            rc.managed = None;
            module.add_resource(rc);
        }
        for pc in raw.providers {
            module.add_provider(pc);
        }
        module
    }
}

/// A node in the static module tree. Children are keyed by module call name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub module: Module,
    #[serde(default)]
    pub children: BTreeMap<String, Config>,
}

impl Config {
    pub fn descendent(&self, calls: &[&str]) -> Option<&Config> {
        let mut current = self;
        for call in calls {
            current = current.children.get(*call)?;
        }
        Some(current)
    }

    /// The static configuration for a module instance. Instance keys are
    /// ignored since every instance of a call shares one configuration.
    pub fn descendent_for_instance(&self, path: &ModuleInstance) -> Option<&Config> {
        let calls: Vec<&str> = path.call_names().collect();
        self.descendent(&calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::InstanceKey;
    use crate::lang::UNKNOWN_VALUE;
    use serde_json::json;

    fn sample_config() -> Config {
        serde_json::from_value(json!({
            "module": {
                "resources": [{
                    "type": "aws_instance",
                    "name": "web",
                    "count": {"reference": "var.count"},
                    "config": {
                        "attributes": {
                            "ami": {"reference": "data.aws_ami.base.id"},
                            "subnet_id": {"template": [
                                {"literal": "subnet-"},
                                {"reference": "module.net.subnet"}
                            ]}
                        }
                    },
                    "depends_on": ["aws_security_group.sg"],
                    "managed": {"prevent_destroy": true}
                }],
                "data": [{"type": "aws_ami", "name": "base"}],
                "providers": [{"name": "aws", "alias": "east"}]
            },
            "children": {
                "net": {"module": {"resources": [{"type": "aws_vpc", "name": "main"}]}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_module_keys_and_modes() {
        let config = sample_config();
        let web = &config.module.managed_resources["aws_instance.web"];
        assert_eq!(web.mode, ResourceMode::Managed);
        assert!(web.prevent_destroy());
        let ami = &config.module.data_resources["data.aws_ami.base"];
        assert_eq!(ami.mode, ResourceMode::Data);
        assert!(ami.managed.is_none());
        assert!(config.module.provider_configs.contains_key("provider.aws.east"));
    }

    #[test]
    fn test_resource_by_addr() {
        let config = sample_config();
        let found = config
            .module
            .resource_by_addr(&Resource::data("aws_ami", "base"));
        assert!(found.is_some());
        assert!(config
            .module
            .resource_by_addr(&Resource::managed("aws_ami", "base"))
            .is_none());
    }

    #[test]
    fn test_descendent_for_instance_ignores_keys() {
        let config = sample_config();
        let path = ModuleInstance::root().child("net", InstanceKey::Int(3));
        let child = config.descendent_for_instance(&path).unwrap();
        assert!(child.module.managed_resources.contains_key("aws_vpc.main"));
        let missing = ModuleInstance::root().child("nope", InstanceKey::NoKey);
        assert!(config.descendent_for_instance(&missing).is_none());
    }

    #[test]
    fn test_body_traversals() {
        let config = sample_config();
        let web = &config.module.managed_resources["aws_instance.web"];
        let mut found: Vec<String> = web
            .config
            .traversals(None)
            .into_iter()
            .map(|t| t.to_string())
            .collect();
        found.sort();
        assert_eq!(found, vec!["data.aws_ami.base.id", "module.net.subnet"]);
    }

    #[test]
    fn test_body_traversals_filtered_by_schema() {
        let config = sample_config();
        let web = &config.module.managed_resources["aws_instance.web"];
        let schema = Block::default().with_attribute("ami", crate::schema::Attribute::required());
        let found = web.config.traversals(Some(&schema));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "data.aws_ami.base.id");
    }

    #[test]
    fn test_merge_override_skips_unknown() {
        let body = Body::default().with_attribute("region", Expression::Literal(json!("us-east-1")));
        let mut values = BTreeMap::new();
        values.insert("region".to_string(), json!(UNKNOWN_VALUE));
        values.insert("profile".to_string(), json!("ops"));
        let merged = body.merge_override(&values);
        assert_eq!(
            merged.attributes["region"],
            Expression::Literal(json!("us-east-1"))
        );
        assert_eq!(merged.attributes["profile"], Expression::Literal(json!("ops")));
    }

    #[test]
    fn test_provider_config_addr_defaults_from_type() {
        let rc = ResourceConfig::managed("google_compute_instance", "vm");
        assert_eq!(rc.provider_config_addr(), ProviderConfig::new("google"));
        let rc = ResourceConfig {
            provider: Some(ProviderConfig::with_alias("google", "beta")),
            ..rc
        };
        assert_eq!(rc.provider_config_addr().to_string(), "provider.google.beta");
    }
}
