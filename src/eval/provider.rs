use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Slot, Slots};
use crate::addrs::AbsProviderConfig;
use crate::configs::{Body, ProviderConfigBlock};
use crate::context::EvalContext;
use crate::diagnostics::Diagnostic;
use crate::error::EvalError;
use crate::input::InputOpts;
use crate::providers::LegacyResourceConfig;
use crate::schema::ProviderSchemaRequest;

fn config_body(config: Option<&Arc<ProviderConfigBlock>>) -> Body {
    config.map(|c| c.config.clone()).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct EvalInitProvider {
    pub type_name: String,
    pub addr: AbsProviderConfig,
}

impl EvalInitProvider {
    pub async fn eval(&self, ctx: &EvalContext) -> Result<(), EvalError> {
        ctx.init_provider(&self.type_name, &self.addr).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalGetProvider {
    pub addr: AbsProviderConfig,
    pub output: Slot,
}

impl EvalGetProvider {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let provider = ctx
            .provider(&self.addr)
            .ok_or_else(|| EvalError::ProviderNotInitialized(self.addr.to_string()))?;
        slots.set_provider(self.output, provider);
        Ok(())
    }
}

/// Evaluates the provider block (with collected input merged in) and passes
/// the result to `configure`.
#[derive(Debug, Clone)]
pub struct EvalConfigProvider {
    pub addr: AbsProviderConfig,
    pub provider: Slot,
    pub config: Option<Arc<ProviderConfigBlock>>,
}

impl EvalConfigProvider {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let provider = slots.provider(self.provider)?;
        let schema = provider.get_schema(&ProviderSchemaRequest::default()).await?;
        let subject = self.addr.to_string();

        let body = ctx.build_provider_config(&self.addr.config, &config_body(self.config.as_ref()));
        let (value, diags) = ctx.evaluate_block(&body, &schema.provider, None);
        let (result, warnings) = diags.in_config_body(&subject, &value).err_with_warnings();
        ctx.record_warnings(warnings);
        result?;

        let diags = ctx.configure_provider(&self.addr, &value).await?;
        let (result, warnings) = diags.in_config_body(&subject, &value).err_with_warnings();
        ctx.record_warnings(warnings);
        result
    }
}

#[derive(Debug, Clone)]
pub struct EvalValidateProvider {
    pub addr: AbsProviderConfig,
    pub provider: Slot,
    pub config: Option<Arc<ProviderConfigBlock>>,
}

impl EvalValidateProvider {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let provider = slots.provider(self.provider)?;
        let schema = provider.get_schema(&ProviderSchemaRequest::default()).await?;

        let body = ctx.build_provider_config(&self.addr.config, &config_body(self.config.as_ref()));
        let (value, mut diags) = ctx.evaluate_block(&body, &schema.provider, None);
        if !diags.has_errors() {
            let legacy = LegacyResourceConfig::from_value(&value);
            diags.append(provider.validate(&legacy).await);
        }

        let (result, warnings) = diags
            .in_config_body(&self.addr.to_string(), &value)
            .err_with_warnings();
        ctx.record_warnings(warnings);
        result
    }
}

/// Asks the UI for required provider arguments the configuration leaves
/// unset and records the answers for later configure calls.
#[derive(Debug, Clone)]
pub struct EvalInputProvider {
    pub addr: AbsProviderConfig,
    pub provider: Slot,
    pub config: Option<Arc<ProviderConfigBlock>>,
}

impl EvalInputProvider {
    pub async fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let Some(input) = ctx.input() else {
            ctx.record_warnings(
                Diagnostic::warning(format!("{}: no input source configured", self.addr)).into(),
            );
            return Ok(());
        };
        let provider = slots.provider(self.provider)?;
        let schema = provider.get_schema(&ProviderSchemaRequest::default()).await?;
        let body = config_body(self.config.as_ref());

        let mut values = BTreeMap::new();
        for (name, attr) in schema.provider.required_attributes() {
            if body.attributes.contains_key(name) {
                continue;
            }
            let opts = InputOpts {
                id: format!("{}.{name}", self.addr.config),
                query: format!("{}.{name}", self.addr),
                description: attr.description.clone(),
                default: None,
            };
            match input.input(&opts).await {
                Some(answer) if !answer.is_empty() => {
                    values.insert(name.to_string(), Value::String(answer));
                }
                _ => debug!(provider = %self.addr, attribute = name, "no input given"),
            }
        }

        if !values.is_empty() {
            ctx.set_provider_input(&self.addr.config, values);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalCloseProvider {
    pub addr: AbsProviderConfig,
}

impl EvalCloseProvider {
    pub async fn eval(&self, ctx: &EvalContext) -> Result<(), EvalError> {
        if let Err(err) = ctx.close_provider(&self.addr).await {
            warn!(provider = %self.addr, error = %err, "failed to close provider");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalInitProvisioner {
    pub name: String,
}

impl EvalInitProvisioner {
    pub fn eval(&self, ctx: &EvalContext) -> Result<(), EvalError> {
        ctx.init_provisioner(&self.name)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalGetProvisioner {
    pub name: String,
    pub output: Slot,
}

impl EvalGetProvisioner {
    pub fn eval(&self, ctx: &EvalContext, slots: &mut Slots) -> Result<(), EvalError> {
        let provisioner = ctx
            .provisioner(&self.name)
            .ok_or_else(|| EvalError::ProvisionerNotInitialized(self.name.clone()))?;
        slots.set_provisioner(self.output, provisioner);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvalCloseProvisioner {
    pub name: String,
}

impl EvalCloseProvisioner {
    pub async fn eval(&self, ctx: &EvalContext) -> Result<(), EvalError> {
        ctx.close_provisioner(&self.name).await
    }
}
