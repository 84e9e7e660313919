use std::fmt;

use serde::{Deserialize, Serialize};

use super::AddrError;

/// Distinguishes the instances of a resource or module expanded with
/// `count` or `for_each`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceKey {
    #[default]
    NoKey,
    Int(i64),
    Str(String),
}

impl InstanceKey {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::NoKey)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoKey => Ok(()),
            Self::Int(i) => write!(f, "[{i}]"),
            Self::Str(s) => write!(f, "[{s:?}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraverseStep {
    Attr(String),
    Index(InstanceKey),
}

/// An absolute traversal such as `aws_instance.foo[0].id`.
///
/// Legacy numeric attribute steps (`foo.0`) parse as integer index steps, so
/// dependency strings from old state files read the same as modern syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Traversal {
    root: String,
    steps: Vec<TraverseStep>,
}

impl Traversal {
    pub fn new(root: impl Into<String>, steps: Vec<TraverseStep>) -> Self {
        Self {
            root: root.into(),
            steps,
        }
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn steps(&self) -> &[TraverseStep] {
        &self.steps
    }

    pub fn parse(input: &str) -> Result<Self, AddrError> {
        let syntax = |message: &str| AddrError::Syntax {
            input: input.to_string(),
            message: message.to_string(),
        };

        let mut chars = input.chars().peekable();
        let root = take_ident(&mut chars);
        if root.is_empty() {
            return Err(syntax("expected a root name"));
        }

        let mut steps = Vec::new();
        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    let ident = take_ident(&mut chars);
                    if ident.is_empty() {
                        return Err(syntax("expected an attribute name after '.'"));
                    }
                    match ident.parse::<i64>() {
                        Ok(i) if ident.chars().all(|c| c.is_ascii_digit()) => {
                            steps.push(TraverseStep::Index(InstanceKey::Int(i)))
                        }
                        _ => steps.push(TraverseStep::Attr(ident)),
                    }
                }
                '[' => {
                    let key = if chars.peek() == Some(&'"') {
                        chars.next();
                        let mut s = String::new();
                        loop {
                            match chars.next() {
                                Some('"') => break,
                                Some('\\') => match chars.next() {
                                    Some(escaped) => s.push(escaped),
                                    None => return Err(syntax("unterminated string key")),
                                },
                                Some(other) => s.push(other),
                                None => return Err(syntax("unterminated string key")),
                            }
                        }
                        InstanceKey::Str(s)
                    } else {
                        let mut digits = String::new();
                        while let Some(&d) = chars.peek() {
                            if d == ']' {
                                break;
                            }
                            digits.push(d);
                            chars.next();
                        }
                        let i = digits
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| syntax("index must be an integer or a quoted string"))?;
                        InstanceKey::Int(i)
                    };
                    if chars.next() != Some(']') {
                        return Err(syntax("expected ']'"));
                    }
                    steps.push(TraverseStep::Index(key));
                }
                other => {
                    return Err(syntax(&format!("unexpected character {other:?}")));
                }
            }
        }

        Ok(Self { root, steps })
    }
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for step in &self.steps {
            match step {
                TraverseStep::Attr(name) => write!(f, ".{name}")?,
                TraverseStep::Index(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Traversal {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Traversal {
    type Error = AddrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Traversal> for String {
    fn from(value: Traversal) -> Self {
        value.to_string()
    }
}
