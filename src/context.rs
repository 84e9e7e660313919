//! The runtime every vertex of one walk evaluates against.
//!
//! One [`EvalContext`] is created per walk and cloned into a per-module view
//! for each vertex with [`EvalContext::with_path`]. All views share the
//! provider and provisioner caches, the collected provider input, the hooks
//! and the handles to the walk's diff and state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::addrs::{AbsProviderConfig, AbsResourceInstance, InstanceKey, ModuleInstance, ProviderConfig};
use crate::configs::{Body, Expression};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::EvalError;
use crate::hook::{Hook, HookAction};
use crate::input::UiInput;
use crate::lang::{Evaluator, Scope, StaticEvaluator, ValueType};
use crate::providers::{ComponentFactory, LegacyResourceConfig, ResourceProvider, ResourceProvisioner};
use crate::schema::{Block, ProviderSchema, ProviderSchemaRequest};
use crate::terraform::{SharedDiff, SharedState};
use crate::walk::WalkOperation;

/// Everything a walk supplies to its context.
pub struct ContextOptions {
    pub operation: WalkOperation,
    pub components: Arc<dyn ComponentFactory>,
    pub evaluator: Arc<dyn Evaluator>,
    pub hooks: Vec<Arc<dyn Hook>>,
    pub input: Option<Arc<dyn UiInput>>,
    pub diff: SharedDiff,
    pub state: SharedState,
    pub stop: CancellationToken,
}

impl ContextOptions {
    pub fn new(operation: WalkOperation, components: Arc<dyn ComponentFactory>) -> Self {
        Self {
            operation,
            components,
            evaluator: Arc::new(StaticEvaluator::new()),
            hooks: Vec::new(),
            input: None,
            diff: SharedDiff::default(),
            state: SharedState::default(),
            stop: CancellationToken::new(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_input(mut self, input: Arc<dyn UiInput>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_diff(mut self, diff: SharedDiff) -> Self {
        self.diff = diff;
        self
    }

    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = state;
        self
    }

    pub fn with_stop(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }
}

#[derive(Default)]
struct ProviderCache {
    instances: HashMap<AbsProviderConfig, Arc<dyn ResourceProvider>>,
    schemas: HashMap<AbsProviderConfig, Arc<ProviderSchema>>,
}

type ProvisionerKey = (ModuleInstance, String);

struct Shared {
    operation: WalkOperation,
    components: Arc<dyn ComponentFactory>,
    evaluator: Arc<dyn Evaluator>,
    hooks: Vec<Arc<dyn Hook>>,
    input: Option<Arc<dyn UiInput>>,
    stop: CancellationToken,
    diff: SharedDiff,
    state: SharedState,

    providers: Mutex<ProviderCache>,
    /// One async lock per address so that only callers initializing the same
    /// provider wait on each other.
    provider_init: Mutex<HashMap<AbsProviderConfig, Arc<tokio::sync::Mutex<()>>>>,
    provider_input: Mutex<HashMap<AbsProviderConfig, BTreeMap<String, Value>>>,
    provisioners: Mutex<HashMap<ProvisionerKey, Arc<dyn ResourceProvisioner>>>,
    module_call_args: Mutex<HashMap<ModuleInstance, BTreeMap<String, Value>>>,
    warnings: Mutex<Diagnostics>,
}

// Nothing here can be left half-updated by a panic, so a poisoned lock is
// still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A module-scoped view of the walk's shared runtime. Cheap to clone.
///
/// Destroyed deposed instances stay in state as empty entries while the walk
/// runs, so sibling indices don't shift. The walker must call
/// [`EvalContext::finish`] once every vertex has been evaluated (including
/// after a failed walk) to prune them before the state is persisted.
#[derive(Clone)]
pub struct EvalContext {
    path: ModuleInstance,
    shared: Arc<Shared>,
}

impl EvalContext {
    pub fn new(opts: ContextOptions) -> Self {
        Self {
            path: ModuleInstance::root(),
            shared: Arc::new(Shared {
                operation: opts.operation,
                components: opts.components,
                evaluator: opts.evaluator,
                hooks: opts.hooks,
                input: opts.input,
                stop: opts.stop,
                diff: opts.diff,
                state: opts.state,
                providers: Mutex::default(),
                provider_init: Mutex::default(),
                provider_input: Mutex::default(),
                provisioners: Mutex::default(),
                module_call_args: Mutex::default(),
                warnings: Mutex::default(),
            }),
        }
    }

    pub fn with_path(&self, path: ModuleInstance) -> Self {
        Self {
            path,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn path(&self) -> &ModuleInstance {
        &self.path
    }

    pub fn operation(&self) -> WalkOperation {
        self.shared.operation
    }

    pub fn stop_token(&self) -> &CancellationToken {
        &self.shared.stop
    }

    pub fn stopped(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    pub fn input(&self) -> Option<&Arc<dyn UiInput>> {
        self.shared.input.as_ref()
    }

    /// Runs `f` against every hook in order. Returns [`EvalError::EarlyExit`]
    /// if the walk was stopped or a hook asks to halt.
    pub fn hook<F>(&self, f: F) -> Result<(), EvalError>
    where
        F: Fn(&dyn Hook) -> HookAction,
    {
        if self.stopped() {
            debug!(path = %self.path, "walk stopped, skipping hooks");
            return Err(EvalError::EarlyExit);
        }
        for hook in &self.shared.hooks {
            if f(hook.as_ref()) == HookAction::Halt {
                warn!(path = %self.path, "hook requested halt");
                return Err(EvalError::EarlyExit);
            }
        }
        Ok(())
    }

    /// Creates the provider for `addr`, fetches its schema and caches both.
    /// Initializing the same address twice is an error.
    pub async fn init_provider(
        &self,
        type_name: &str,
        addr: &AbsProviderConfig,
    ) -> Result<Arc<dyn ResourceProvider>, EvalError> {
        let init_lock = Arc::clone(lock(&self.shared.provider_init).entry(addr.clone()).or_default());
        let _init = init_lock.lock().await;

        if self.provider(addr).is_some() {
            return Err(EvalError::ProviderAlreadyInitialized(addr.to_string()));
        }

        let provider = self
            .shared
            .components
            .resource_provider(type_name, &addr.to_string())?;
        let req = ProviderSchemaRequest {
            resource_types: provider.resources().into_iter().map(|r| r.name).collect(),
            data_sources: provider.data_sources().into_iter().map(|d| d.name).collect(),
        };
        let schema = provider
            .get_schema(&req)
            .await
            .map_err(|source| EvalError::Schema {
                addr: addr.to_string(),
                source,
            })?;

        let mut cache = lock(&self.shared.providers);
        cache.schemas.insert(addr.clone(), Arc::new(schema));
        cache.instances.insert(addr.clone(), Arc::clone(&provider));
        debug!(provider = %addr, "initialized provider");
        Ok(provider)
    }

    pub fn provider(&self, addr: &AbsProviderConfig) -> Option<Arc<dyn ResourceProvider>> {
        lock(&self.shared.providers).instances.get(addr).cloned()
    }

    pub fn provider_schema(&self, addr: &AbsProviderConfig) -> Option<Arc<ProviderSchema>> {
        lock(&self.shared.providers).schemas.get(addr).cloned()
    }

    /// Closes and forgets the provider (with its schema and init lock) if it
    /// holds a connection. Providers that can't be closed stay cached;
    /// unknown addresses are a no-op.
    pub async fn close_provider(&self, addr: &AbsProviderConfig) -> Result<(), EvalError> {
        let provider = {
            let mut cache = lock(&self.shared.providers);
            let closable = cache
                .instances
                .get(addr)
                .is_some_and(|p| p.as_closer().is_some());
            if closable {
                cache.schemas.remove(addr);
                cache.instances.remove(addr)
            } else {
                None
            }
        };
        if provider.is_some() {
            lock(&self.shared.provider_init).remove(addr);
        }
        if let Some(provider) = provider
            && let Some(closer) = provider.as_closer()
        {
            closer.close().await?;
            debug!(provider = %addr, "closed provider");
        }
        Ok(())
    }

    /// Hands an evaluated provider body to the provider, returning what it
    /// reported.
    pub async fn configure_provider(
        &self,
        addr: &AbsProviderConfig,
        value: &Value,
    ) -> Result<Diagnostics, EvalError> {
        let provider = self
            .provider(addr)
            .ok_or_else(|| EvalError::ProviderNotInitialized(addr.to_string()))?;
        let config = LegacyResourceConfig::from_value(value);

        let mut diags = Diagnostics::new();
        if let Err(err) = provider.configure(&config).await {
            diags.push(Diagnostic::error(format!("Error configuring {addr}")).with_detail(err.to_string()));
        }
        Ok(diags)
    }

    /// Input collected for `pc`, looking in this module first and then in
    /// each enclosing module up to the root.
    pub fn provider_input(&self, pc: &ProviderConfig) -> Option<BTreeMap<String, Value>> {
        let inputs = lock(&self.shared.provider_input);
        (0..=self.path.len())
            .rev()
            .find_map(|len| inputs.get(&pc.absolute(self.path.prefix(len))).cloned())
    }

    pub fn set_provider_input(&self, pc: &ProviderConfig, values: BTreeMap<String, Value>) {
        let addr = pc.absolute(self.path.clone());
        debug!(provider = %addr, count = values.len(), "recorded provider input");
        lock(&self.shared.provider_input).insert(addr, values);
    }

    /// The provider body with collected input laid over it.
    pub fn build_provider_config(&self, pc: &ProviderConfig, body: &Body) -> Body {
        match self.provider_input(pc) {
            Some(input) if !input.is_empty() => body.merge_override(&input),
            _ => body.clone(),
        }
    }

    pub fn init_provisioner(&self, name: &str) -> Result<Arc<dyn ResourceProvisioner>, EvalError> {
        let key = (self.path.clone(), name.to_string());
        let mut cache = lock(&self.shared.provisioners);
        if cache.contains_key(&key) {
            return Err(EvalError::ProvisionerAlreadyInitialized(name.to_string()));
        }
        let uid = if self.path.is_root() {
            name.to_string()
        } else {
            format!("{}.provisioner.{name}", self.path)
        };
        let provisioner = self.shared.components.resource_provisioner(name, &uid)?;
        cache.insert(key, Arc::clone(&provisioner));
        debug!(path = %self.path, provisioner = name, "initialized provisioner");
        Ok(provisioner)
    }

    pub fn provisioner(&self, name: &str) -> Option<Arc<dyn ResourceProvisioner>> {
        lock(&self.shared.provisioners)
            .get(&(self.path.clone(), name.to_string()))
            .cloned()
    }

    pub async fn close_provisioner(&self, name: &str) -> Result<(), EvalError> {
        let key = (self.path.clone(), name.to_string());
        let provisioner = {
            let mut cache = lock(&self.shared.provisioners);
            let closable = cache.get(&key).is_some_and(|p| p.as_closer().is_some());
            if closable { cache.remove(&key) } else { None }
        };
        if let Some(provisioner) = provisioner
            && let Some(closer) = provisioner.as_closer()
        {
            closer.close().await?;
        }
        Ok(())
    }

    pub fn evaluate_block(
        &self,
        body: &Body,
        schema: &Block,
        self_addr: Option<&AbsResourceInstance>,
    ) -> (Value, Diagnostics) {
        let scope = Scope {
            module: &self.path,
            self_addr,
        };
        self.shared.evaluator.evaluate_block(&scope, body, schema)
    }

    pub fn evaluate_expr(
        &self,
        expr: &Expression,
        want: ValueType,
        self_addr: Option<&AbsResourceInstance>,
    ) -> (Value, Diagnostics) {
        let scope = Scope {
            module: &self.path,
            self_addr,
        };
        self.shared.evaluator.evaluate_expr(&scope, expr, want)
    }

    /// Records the arguments passed to the child module instance `call[key]`
    /// of this module.
    pub fn set_module_call_arguments(&self, call: &str, key: InstanceKey, values: BTreeMap<String, Value>) {
        let child = self.path.child(call, key);
        lock(&self.shared.module_call_args).insert(child, values);
    }

    /// Arguments this module instance was called with.
    pub fn module_call_arguments(&self) -> Option<BTreeMap<String, Value>> {
        lock(&self.shared.module_call_args).get(&self.path).cloned()
    }

    pub fn diff(&self) -> &SharedDiff {
        &self.shared.diff
    }

    pub fn state(&self) -> &SharedState {
        &self.shared.state
    }

    pub fn record_warnings(&self, diags: Diagnostics) {
        if !diags.is_empty() {
            lock(&self.shared.warnings).append(diags);
        }
    }

    pub fn warnings(&self) -> Diagnostics {
        lock(&self.shared.warnings).clone()
    }

    /// Ends the walk: state entries emptied during evaluation are pruned.
    /// Nothing else calls this; see the type-level docs.
    pub async fn finish(&self) {
        self.shared.state.write().await.prune();
    }
}
