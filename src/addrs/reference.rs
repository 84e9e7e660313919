use std::fmt;

use super::{AddrError, InstanceKey, Resource, ResourceInstance, ResourceMode, Traversal, TraverseStep};

/// Anything an expression can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Referenceable {
    Resource(Resource),
    ResourceInstance(ResourceInstance),
    ModuleCall { name: String },
    ModuleCallOutput { call: String, name: String },
    InputVariable { name: String },
    LocalValue { name: String },
    CountAttr { name: String },
    ForEachAttr { name: String },
    PathAttr { name: String },
    TerraformAttr { name: String },
    SelfRef,
}

impl Referenceable {
    /// Flat dependency string as stored in legacy state files, e.g.
    /// `aws_instance.foo.0` or `module.net.vpc_id`.
    pub fn legacy_string(&self) -> String {
        match self {
            Self::ResourceInstance(ri) => match &ri.key {
                InstanceKey::Int(i) => format!("{}.{i}", ri.resource),
                _ => ri.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Referenceable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(r) => write!(f, "{r}"),
            Self::ResourceInstance(ri) => write!(f, "{ri}"),
            Self::ModuleCall { name } => write!(f, "module.{name}"),
            Self::ModuleCallOutput { call, name } => write!(f, "module.{call}.{name}"),
            Self::InputVariable { name } => write!(f, "var.{name}"),
            Self::LocalValue { name } => write!(f, "local.{name}"),
            Self::CountAttr { name } => write!(f, "count.{name}"),
            Self::ForEachAttr { name } => write!(f, "each.{name}"),
            Self::PathAttr { name } => write!(f, "path.{name}"),
            Self::TerraformAttr { name } => write!(f, "terraform.{name}"),
            Self::SelfRef => f.write_str("self"),
        }
    }
}

/// A parsed reference: the object referred to plus any remaining attribute
/// steps (`aws_instance.foo[0].id` has subject `aws_instance.foo[0]`,
/// remaining `.id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub subject: Referenceable,
    pub remaining: Vec<TraverseStep>,
}

impl Reference {
    pub fn parse(traversal: &Traversal) -> Result<Self, AddrError> {
        let input = traversal.to_string();
        let invalid = |message: &str| AddrError::InvalidReference {
            input: input.clone(),
            message: message.to_string(),
        };
        let steps = traversal.steps();
        let attr_at = |i: usize| match steps.get(i) {
            Some(TraverseStep::Attr(name)) => Some(name.clone()),
            _ => None,
        };

        let simple = |make: fn(String) -> Referenceable, what: &str| {
            let name = attr_at(0).ok_or_else(|| invalid(&format!("{what} requires an attribute name")))?;
            Ok::<_, AddrError>((make(name), 1))
        };

        let (subject, consumed) = match traversal.root_name() {
            "var" => simple(|name| Referenceable::InputVariable { name }, "var")?,
            "local" => simple(|name| Referenceable::LocalValue { name }, "local")?,
            "count" => simple(|name| Referenceable::CountAttr { name }, "count")?,
            "each" => simple(|name| Referenceable::ForEachAttr { name }, "each")?,
            "path" => simple(|name| Referenceable::PathAttr { name }, "path")?,
            "terraform" => simple(|name| Referenceable::TerraformAttr { name }, "terraform")?,
            "self" => (Referenceable::SelfRef, 0),
            "module" => {
                let call = attr_at(0).ok_or_else(|| invalid("module requires a call name"))?;
                // Skip an instance key on the call itself.
                let mut next = 1;
                if matches!(steps.get(1), Some(TraverseStep::Index(_))) {
                    next = 2;
                }
                match attr_at(next) {
                    Some(name) => (Referenceable::ModuleCallOutput { call, name }, next + 1),
                    None => (Referenceable::ModuleCall { name: call }, next),
                }
            }
            "data" => {
                let type_name = attr_at(0).ok_or_else(|| invalid("data requires a type"))?;
                let name = attr_at(1).ok_or_else(|| invalid("data requires a name"))?;
                resource_subject(Resource::data(type_name, name), steps.get(2))
            }
            type_name => {
                let name = attr_at(0).ok_or_else(|| invalid("resource requires a name"))?;
                resource_subject(Resource::managed(type_name, name), steps.get(1))
            }
        };

        Ok(Self {
            subject,
            remaining: steps[consumed.min(steps.len())..].to_vec(),
        })
    }

    /// Parses a legacy dependency string such as `aws_instance.foo.0`.
    pub fn parse_legacy(dep: &str) -> Result<Self, AddrError> {
        Self::parse(&Traversal::parse(dep)?)
    }
}

fn resource_subject(resource: Resource, next: Option<&TraverseStep>) -> (Referenceable, usize) {
    let base = match resource.mode {
        ResourceMode::Managed => 1,
        ResourceMode::Data => 2,
    };
    match next {
        Some(TraverseStep::Index(key)) => (
            Referenceable::ResourceInstance(resource.instance(key.clone())),
            base + 1,
        ),
        _ => (Referenceable::Resource(resource), base),
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject)?;
        for step in &self.remaining {
            match step {
                TraverseStep::Attr(name) => write!(f, ".{name}")?,
                TraverseStep::Index(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}
