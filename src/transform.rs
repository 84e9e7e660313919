//! Passes that enrich an already-built graph before it is walked.

mod attach_config;
mod attach_schema;
mod deposed;
mod orphan;

pub use attach_config::AttachResourceConfigTransformer;
pub use attach_schema::AttachResourceSchemaTransformer;
pub use deposed::DeposedTransformer;
pub use orphan::OrphanResourceInstanceTransformer;
