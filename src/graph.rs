//! A minimal vertex container for one module.
//!
//! Edges and walk ordering are owned by the caller's graph library. This
//! type is only the surface transforms mutate and the walker evaluates.

use thiserror::Error;

use crate::addrs::{AddrError, ModuleInstance};
use crate::node::Vertex;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid instance key {key:?} in state: {source}")]
    InvalidStateKey {
        key: String,
        #[source]
        source: AddrError,
    },

    #[error("invalid instance provider address {addr:?} in state: {source}")]
    InvalidProviderAddress {
        addr: String,
        #[source]
        source: AddrError,
    },
}

/// A pass that mutates an already-built graph.
pub trait GraphTransformer {
    fn transform(&self, graph: &mut Graph) -> Result<(), GraphError>;
}

#[derive(Debug, Default)]
pub struct Graph {
    path: ModuleInstance,
    vertices: Vec<Vertex>,
}

impl Graph {
    pub fn new(path: ModuleInstance) -> Self {
        Self {
            path,
            vertices: Vec::new(),
        }
    }

    pub fn path(&self) -> &ModuleInstance {
        &self.path
    }

    pub fn add(&mut self, vertex: Vertex) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }

    /// Runs each transformer in order, stopping at the first error.
    pub fn apply_transforms(&mut self, transforms: &[&dyn GraphTransformer]) -> Result<(), GraphError> {
        for t in transforms {
            t.transform(self)?;
            tracing::trace!(vertices = self.len(), "graph after transform");
        }
        Ok(())
    }
}
