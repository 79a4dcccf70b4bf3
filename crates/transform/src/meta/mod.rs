//! Composite transforms
//!
//! Meta transforms wrap an ordered list of inner transforms behind the same
//! [`Transformer`](crate::Transformer) capability, so pipelines nest without
//! a dedicated container type.

mod for_each;
mod pipeline;

pub use for_each::{ForEachFactory, MetaForEach};
pub use pipeline::{MetaPipeline, PipelineFactory};
