//! Configuration schemas as reported by providers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::default()
        }
    }

    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The expected shape of one configuration body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub block_types: BTreeMap<String, Block>,
}

impl Block {
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: Block) -> Self {
        self.block_types.insert(name.into(), block);
        self
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.required)
            .map(|(name, attr)| (name.as_str(), attr))
    }
}

/// Everything a provider declares about itself and the types it manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Block,
    #[serde(default)]
    pub resource_types: BTreeMap<String, Block>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, Block>,
}

impl ProviderSchema {
    pub fn resource_type(&self, type_name: &str) -> Option<&Block> {
        self.resource_types.get(type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&Block> {
        self.data_sources.get(type_name)
    }
}

/// Which resource and data source schemas the caller wants back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSchemaRequest {
    pub resource_types: Vec<String>,
    pub data_sources: Vec<String>,
}
