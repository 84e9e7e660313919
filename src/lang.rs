//! The boundary to the expression language.
//!
//! Expression evaluation proper lives outside this crate; an [`Evaluator`]
//! turns expressions and bodies into JSON values plus diagnostics.
//! [`StaticEvaluator`] resolves literals and a fixed table of known
//! references, and treats everything else as not yet known.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::addrs::{AbsResourceInstance, ModuleInstance};
use crate::configs::{Body, Expression};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::Block;

/// Placeholder for values that will only be known after apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

pub fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

pub fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Any,
    String,
    Number,
    Bool,
    List,
    Map,
}

impl ValueType {
    /// Null and unknown values conform to every type.
    pub fn conforms(self, value: &Value) -> bool {
        if value.is_null() || is_unknown(value) {
            return true;
        }
        match self {
            Self::Any => true,
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
        }
    }
}

/// Where an expression is being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub module: &'a ModuleInstance,
    /// The resource instance `self` refers to, if any.
    pub self_addr: Option<&'a AbsResourceInstance>,
}

pub trait Evaluator: Send + Sync {
    fn evaluate_expr(&self, scope: &Scope<'_>, expr: &Expression, want: ValueType) -> (Value, Diagnostics);

    /// Evaluates a body into an object conforming to `schema`.
    fn evaluate_block(&self, scope: &Scope<'_>, body: &Body, schema: &Block) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut obj = Map::new();

        for name in body.attributes.keys() {
            if !schema.attributes.contains_key(name) {
                diags.push(
                    Diagnostic::error("Unsupported argument")
                        .with_detail(format!("An argument named {name:?} is not expected here.")),
                );
            }
        }
        for nested in &body.blocks {
            if !schema.block_types.contains_key(&nested.type_name) {
                diags.push(Diagnostic::error("Unsupported block type").with_detail(format!(
                    "Blocks of type {:?} are not expected here.",
                    nested.type_name
                )));
            }
        }

        for (name, attr) in &schema.attributes {
            match body.attributes.get(name) {
                Some(expr) => {
                    let (value, more) = self.evaluate_expr(scope, expr, ValueType::Any);
                    diags.append(more);
                    obj.insert(name.clone(), value);
                }
                None if attr.required => {
                    diags.push(Diagnostic::error("Missing required argument").with_detail(format!(
                        "The argument {name:?} is required, but no definition was found."
                    )));
                }
                None => {
                    obj.insert(name.clone(), Value::Null);
                }
            }
        }

        for (type_name, block_schema) in &schema.block_types {
            let mut items = Vec::new();
            for nested in body.blocks.iter().filter(|b| &b.type_name == type_name) {
                let (value, more) = self.evaluate_block(scope, &nested.body, block_schema);
                diags.append(more);
                items.push(value);
            }
            obj.insert(type_name.clone(), Value::Array(items));
        }

        (Value::Object(obj), diags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticEvaluator {
    known: BTreeMap<String, Value>,
}

impl StaticEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the value for a reference such as `var.region`.
    pub fn with_value(mut self, reference: impl Into<String>, value: Value) -> Self {
        self.known.insert(reference.into(), value);
        self
    }

    fn resolve(&self, expr: &Expression) -> Value {
        match expr {
            Expression::Literal(value) => value.clone(),
            Expression::Reference(traversal) => self
                .known
                .get(&traversal.to_string())
                .cloned()
                .unwrap_or_else(unknown),
            Expression::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match self.resolve(part) {
                        v if is_unknown(&v) => return unknown(),
                        Value::String(s) => out.push_str(&s),
                        Value::Null => {}
                        other => out.push_str(&other.to_string()),
                    }
                }
                Value::String(out)
            }
        }
    }
}

impl Evaluator for StaticEvaluator {
    fn evaluate_expr(&self, _scope: &Scope<'_>, expr: &Expression, want: ValueType) -> (Value, Diagnostics) {
        let value = self.resolve(expr);
        let mut diags = Diagnostics::new();
        if !want.conforms(&value) {
            diags.push(
                Diagnostic::error("Incorrect value type")
                    .with_detail(format!("Expected a value of type {want:?}, got {value}.")),
            );
        }
        (value, diags)
    }
}
