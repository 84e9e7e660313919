use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AddrError, ModuleInstance, Traversal, TraverseStep};

/// A provider configuration relative to its module: `provider.aws` or
/// `provider.aws.east` when aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ProviderConfig {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            alias: None,
        }
    }

    pub fn with_alias(type_name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Guesses the provider type from a resource type: everything before the
    /// first underscore (`aws_instance` -> `aws`).
    pub fn default_for_resource_type(resource_type: &str) -> Self {
        let type_name = resource_type
            .split_once('_')
            .map_or(resource_type, |(prefix, _)| prefix);
        Self::new(type_name)
    }

    pub fn absolute(&self, module: ModuleInstance) -> AbsProviderConfig {
        AbsProviderConfig {
            module,
            config: self.clone(),
        }
    }
}

impl fmt::Display for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "provider.{}.{alias}", self.type_name),
            None => write!(f, "provider.{}", self.type_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsProviderConfig {
    pub module: ModuleInstance,
    pub config: ProviderConfig,
}

impl AbsProviderConfig {
    /// Parses addresses like `provider.aws` or `module.net.provider.aws.east`.
    pub fn parse(input: &str) -> Result<Self, AddrError> {
        let invalid = |message: &str| AddrError::InvalidProvider {
            input: input.to_string(),
            message: message.to_string(),
        };

        let traversal = Traversal::parse(input)?;
        let (module, rest) =
            ModuleInstance::parse_prefix(traversal.root_name(), traversal.steps(), input)?;
        let Some((word, steps)) = rest else {
            return Err(invalid("missing provider part"));
        };
        if word != "provider" {
            return Err(invalid("expected 'provider'"));
        }

        let names: Vec<&str> = steps
            .iter()
            .map(|step| match step {
                TraverseStep::Attr(name) => Ok(name.as_str()),
                TraverseStep::Index(_) => Err(invalid("provider address cannot be indexed")),
            })
            .collect::<Result<_, _>>()?;

        let config = match names.as_slice() {
            [type_name] => ProviderConfig::new(*type_name),
            [type_name, alias] => ProviderConfig::with_alias(*type_name, *alias),
            [] => return Err(invalid("missing provider type")),
            _ => return Err(invalid("extraneous steps after provider alias")),
        };

        Ok(Self { module, config })
    }
}

impl fmt::Display for AbsProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_root() {
            write!(f, "{}", self.config)
        } else {
            write!(f, "{}.{}", self.module, self.config)
        }
    }
}
