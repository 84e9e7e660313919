mod args;

pub use args::{Cli, Command};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use tabled::{Table, Tabled};
use termtree::Tree;
use tracing::{debug, info, warn};

use args::InputArgs;
use tfeval::addrs::ModuleInstance;
use tfeval::configs::Config;
use tfeval::graph::Graph;
use tfeval::schema::ProviderSchema;
use tfeval::node::{NodeAbstractResource, NodeApplyableProvider, NodeCloseProvider, Vertex};
use tfeval::terraform::State;
use tfeval::transform::{
    AttachResourceConfigTransformer, AttachResourceSchemaTransformer, DeposedTransformer,
    OrphanResourceInstanceTransformer,
};
use tfeval::WalkOperation;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Graph(args) => {
            let graph = load_graph(&args.input)?;
            print_vertices(&graph);
        }
        Command::Explain(args) => {
            let graph = load_graph(&args.input)?;
            for tree in explain(&graph, args.walk) {
                print!("{tree}");
            }
        }
    }
    Ok(())
}

fn load_json<T: DeserializeOwned + Default>(path: Option<&Path>, what: &str) -> Result<T> {
    let Some(path) = path else {
        debug!(what, "no file given, starting empty");
        return Ok(T::default());
    };
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("failed to parse {what} in {}", path.display()))
}

fn load_graph(input: &InputArgs) -> Result<Graph> {
    let config: Config = load_json(input.config.as_deref(), "configuration")?;
    let state: State = load_json(input.state.as_deref(), "state")?;
    let schemas: BTreeMap<String, ProviderSchema> =
        load_json(input.schemas.as_deref(), "provider schemas")?;
    let path = ModuleInstance::parse(&input.module)
        .wrap_err_with(|| format!("invalid module path {:?}", input.module))?;
    build_graph(&config, &state, &schemas, path)
}

/// Declared resources, orphans and deposed instances of one module, with
/// configuration and known schemas attached and one provider (plus its
/// closer) per consumer.
fn build_graph(
    config: &Config,
    state: &State,
    schemas: &BTreeMap<String, ProviderSchema>,
    path: ModuleInstance,
) -> Result<Graph> {
    let mut graph = Graph::new(path.clone());
    if let Some(module) = config.descendent_for_instance(&path) {
        for rc in module
            .module
            .managed_resources
            .values()
            .chain(module.module.data_resources.values())
        {
            graph.add(NodeAbstractResource::new(rc.addr().absolute(path.clone())).into());
        }
    }

    graph.apply_transforms(&[
        &OrphanResourceInstanceTransformer { config, state },
        &DeposedTransformer { state, view: None },
        &AttachResourceConfigTransformer { config },
        &AttachResourceSchemaTransformer { schemas },
    ])?;

    let mut providers = BTreeSet::new();
    for vertex in graph.vertices_mut() {
        let name = vertex.name();
        let Some(consumer) = vertex.as_provider_consumer_mut() else {
            continue;
        };
        let wanted = consumer.provided_by();
        for diag in wanted.diagnostics.iter() {
            warn!(vertex = %name, "{diag}");
        }
        consumer.set_provider(wanted.addr.clone());
        providers.insert(wanted.addr);
    }

    for addr in providers {
        let block = config
            .descendent_for_instance(&addr.module)
            .and_then(|c| c.module.provider_config(&addr.config))
            .cloned();
        graph.add(NodeApplyableProvider::new(addr.clone(), block).into());
        graph.add(NodeCloseProvider::new(addr).into());
    }

    info!(path = %graph.path(), vertices = graph.len(), "graph built");
    Ok(graph)
}

#[derive(Debug, Tabled)]
struct VertexRow {
    name: String,
    kind: String,
    provider: String,
    references: String,
}

impl From<&Vertex> for VertexRow {
    fn from(v: &Vertex) -> Self {
        let provider = v
            .as_provider_consumer()
            .map(|c| {
                let p = c.provided_by();
                if p.exact {
                    format!("{} (exact)", p.addr)
                } else {
                    p.addr.to_string()
                }
            })
            .unwrap_or_default();
        let references = v
            .as_referencer()
            .map(|r| {
                r.references()
                    .iter()
                    .map(|r| r.subject.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        Self {
            name: v.name(),
            kind: v.kind().to_string(),
            provider,
            references,
        }
    }
}

fn print_vertices(graph: &Graph) {
    if graph.is_empty() {
        println!("No vertices");
        return;
    }
    let rows: Vec<VertexRow> = graph.vertices().iter().map(VertexRow::from).collect();
    println!("{}", Table::new(rows));
}

fn explain(graph: &Graph, op: WalkOperation) -> Vec<Tree<String>> {
    graph
        .vertices()
        .iter()
        .map(|v| {
            let mut tree = Tree::new(v.name());
            match v.as_evalable() {
                Some(node) => match node.eval_tree().for_walk(op) {
                    Some(ops) => tree.push(ops.to_tree()),
                    None => tree.push(Tree::new(format!("(nothing runs during {op})"))),
                },
                None => tree.push(Tree::new("(no evaluation tree)".to_string())),
            };
            tree
        })
        .collect()
}
