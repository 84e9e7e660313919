use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AddrError, InstanceKey, ModuleInstance, ProviderConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMode {
    Managed,
    Data,
}

/// A resource relative to its module: `aws_instance.web` or `data.aws_ami.base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

impl Resource {
    pub fn managed(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mode: ResourceMode::Managed,
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn data(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mode: ResourceMode::Data,
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn instance(&self, key: InstanceKey) -> ResourceInstance {
        ResourceInstance {
            resource: self.clone(),
            key,
        }
    }

    pub fn absolute(&self, module: ModuleInstance) -> AbsResource {
        AbsResource {
            module,
            resource: self.clone(),
        }
    }

    /// The provider configuration implied by the resource type alone.
    pub fn default_provider_config(&self) -> ProviderConfig {
        ProviderConfig::default_for_resource_type(&self.type_name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ResourceMode::Managed => write!(f, "{}.{}", self.type_name, self.name),
            ResourceMode::Data => write!(f, "data.{}.{}", self.type_name, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceInstance {
    pub resource: Resource,
    pub key: InstanceKey,
}

impl ResourceInstance {
    pub fn containing_resource(&self) -> Resource {
        self.resource.clone()
    }

    pub fn absolute(&self, module: ModuleInstance) -> AbsResourceInstance {
        AbsResourceInstance {
            module,
            resource: self.clone(),
        }
    }

    /// Legacy resource key used inside a module's state: `[data.]TYPE.NAME[.INDEX]`.
    pub fn state_key(&self) -> String {
        match &self.key {
            InstanceKey::NoKey => self.resource.to_string(),
            InstanceKey::Int(i) => format!("{}.{i}", self.resource),
            InstanceKey::Str(_) => format!("{}{}", self.resource, self.key),
        }
    }

    pub fn parse_state_key(key: &str) -> Result<Self, AddrError> {
        let invalid = |message: &str| AddrError::InvalidStateKey {
            input: key.to_string(),
            message: message.to_string(),
        };

        let mut parts: Vec<&str> = key.split('.').collect();
        let mode = if parts.first() == Some(&"data") {
            parts.remove(0);
            ResourceMode::Data
        } else {
            ResourceMode::Managed
        };

        let (type_name, name, index) = match parts.as_slice() {
            [t, n] => (*t, *n, None),
            [t, n, i] => (*t, *n, Some(*i)),
            _ => return Err(invalid("expected TYPE.NAME or TYPE.NAME.INDEX")),
        };
        if type_name.is_empty() || name.is_empty() {
            return Err(invalid("type and name must not be empty"));
        }

        let key = match index {
            None => InstanceKey::NoKey,
            Some(i) => InstanceKey::Int(
                i.parse::<i64>()
                    .map_err(|_| invalid("index must be an integer"))?,
            ),
        };

        Ok(Self {
            resource: Resource {
                mode,
                type_name: type_name.to_string(),
                name: name.to_string(),
            },
            key,
        })
    }
}

impl fmt::Display for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.resource, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsResource {
    pub module: ModuleInstance,
    pub resource: Resource,
}

impl AbsResource {
    pub fn instance(&self, key: InstanceKey) -> AbsResourceInstance {
        AbsResourceInstance {
            module: self.module.clone(),
            resource: self.resource.instance(key),
        }
    }
}

impl fmt::Display for AbsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_root() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.module, self.resource)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsResourceInstance {
    pub module: ModuleInstance,
    pub resource: ResourceInstance,
}

impl AbsResourceInstance {
    pub fn containing_resource(&self) -> AbsResource {
        AbsResource {
            module: self.module.clone(),
            resource: self.resource.containing_resource(),
        }
    }
}

impl fmt::Display for AbsResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_root() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.module, self.resource)
        }
    }
}
