use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AddrError, InstanceKey, Traversal, TraverseStep};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleInstanceStep {
    pub name: String,
    pub key: InstanceKey,
}

/// Path of a module instance from the root, e.g. `module.net["east"].module.vpc`.
///
/// Serializes in the legacy state layout (`["root", "net", "vpc"]`), which has
/// no room for instance keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ModuleInstance(Vec<ModuleInstanceStep>);

impl ModuleInstance {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[ModuleInstanceStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: impl Into<String>, key: InstanceKey) -> Self {
        let mut steps = self.0.clone();
        steps.push(ModuleInstanceStep {
            name: name.into(),
            key,
        });
        Self(steps)
    }

    /// The first `len` steps of this path.
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Module call names from the root, ignoring instance keys.
    pub fn call_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.name.as_str())
    }

    /// Legacy path form, always starting with `"root"`.
    pub fn legacy_path(&self) -> Vec<String> {
        std::iter::once("root".to_string())
            .chain(self.0.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// Parses `module.a.module.b[0]`. An empty string is the root module.
    pub fn parse(input: &str) -> Result<Self, AddrError> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        let traversal = Traversal::parse(input)?;
        match Self::parse_prefix(traversal.root_name(), traversal.steps(), input)? {
            (path, None) => Ok(path),
            (_, Some((word, _))) => Err(AddrError::Syntax {
                input: input.to_string(),
                message: format!("expected 'module', found {word:?}"),
            }),
        }
    }

    /// Consumes leading `module.NAME[KEY]` steps from a traversal, returning
    /// the module path and the unconsumed remainder (root name plus steps).
    pub(crate) fn parse_prefix(
        root: &str,
        steps: &[TraverseStep],
        input: &str,
    ) -> Result<(Self, Option<(String, Vec<TraverseStep>)>), AddrError> {
        let mut path = Vec::new();
        let mut names = std::iter::once(TraverseStep::Attr(root.to_string()))
            .chain(steps.iter().cloned())
            .peekable();

        while let Some(step) = names.next() {
            let TraverseStep::Attr(word) = step else {
                return Err(AddrError::Syntax {
                    input: input.to_string(),
                    message: "unexpected index step".to_string(),
                });
            };
            if word != "module" {
                return Ok((Self(path), Some((word, names.collect()))));
            }
            let Some(TraverseStep::Attr(name)) = names.next() else {
                return Err(AddrError::Syntax {
                    input: input.to_string(),
                    message: "module prefix requires a module name".to_string(),
                });
            };
            let key = match names.peek() {
                Some(TraverseStep::Index(_)) => match names.next() {
                    Some(TraverseStep::Index(k)) => k,
                    _ => InstanceKey::NoKey,
                },
                _ => InstanceKey::NoKey,
            };
            path.push(ModuleInstanceStep { name, key });
        }

        Ok((Self(path), None))
    }
}

impl fmt::Display for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "module.{}{}", step.name, step.key)?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for ModuleInstance {
    fn from(legacy: Vec<String>) -> Self {
        let skip = usize::from(legacy.first().is_some_and(|s| s == "root"));
        Self(
            legacy
                .into_iter()
                .skip(skip)
                .map(|name| ModuleInstanceStep {
                    name,
                    key: InstanceKey::NoKey,
                })
                .collect(),
        )
    }
}

impl From<ModuleInstance> for Vec<String> {
    fn from(path: ModuleInstance) -> Self {
        path.legacy_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::Traversal;

    #[test]
    fn test_root_display_is_empty() {
        assert_eq!(ModuleInstance::root().to_string(), "");
        assert!(ModuleInstance::root().is_root());
    }

    #[test]
    fn test_child_display() {
        let path = ModuleInstance::root()
            .child("net", InstanceKey::Str("east".into()))
            .child("vpc", InstanceKey::NoKey);
        assert_eq!(path.to_string(), r#"module.net["east"].module.vpc"#);
        assert_eq!(path.legacy_path(), vec!["root", "net", "vpc"]);
    }

    #[test]
    fn test_prefix() {
        let path = ModuleInstance::root()
            .child("a", InstanceKey::NoKey)
            .child("b", InstanceKey::NoKey);
        assert_eq!(path.prefix(0), ModuleInstance::root());
        assert_eq!(path.prefix(1).to_string(), "module.a");
        assert_eq!(path.prefix(9), path);
    }

    #[test]
    fn test_legacy_round_trip() {
        let path: ModuleInstance = vec!["root".to_string(), "child".to_string()].into();
        assert_eq!(path.to_string(), "module.child");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["root","child"]"#);
    }

    #[test]
    fn test_parse_module_path() {
        assert_eq!(ModuleInstance::parse("").unwrap(), ModuleInstance::root());
        let path = ModuleInstance::parse("module.net[0].module.vpc").unwrap();
        assert_eq!(path.to_string(), "module.net[0].module.vpc");
        assert!(ModuleInstance::parse("module.net.aws_vpc").is_err());
    }

    #[test]
    fn test_parse_prefix_stops_at_non_module() {
        let t = Traversal::parse("module.a[1].provider.aws").unwrap();
        let (path, rest) = ModuleInstance::parse_prefix(t.root_name(), t.steps(), "x").unwrap();
        assert_eq!(path.to_string(), "module.a[1]");
        let (word, steps) = rest.unwrap();
        assert_eq!(word, "provider");
        assert_eq!(steps, vec![TraverseStep::Attr("aws".into())]);
    }
}
