//! No-op transformer
//!
//! Passes every message through unchanged, control included. Used as a
//! placeholder stage and as a fixture in tests.

use std::future::Future;
use std::pin::Pin;

use sluice_message::Message;
use tokio_util::sync::CancellationToken;

use crate::config::TransformConfig;
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::{TransformResult, Transformer};

#[cfg(test)]
#[path = "noop_test.rs"]
mod tests;

/// Pass-through transformer
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Noop {
    /// Create a no-op transformer
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for Noop {
    fn transform<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        msg: Message,
    ) -> Pin<Box<dyn Future<Output = TransformResult<Vec<Message>>> + Send + 'a>> {
        Box::pin(async move { Ok(vec![msg]) })
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Factory for [`Noop`]
#[derive(Debug, Clone, Copy)]
pub struct NoopFactory;

impl TransformerFactory for NoopFactory {
    fn create(
        &self,
        _registry: &TransformerRegistry,
        _config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        Ok(Box::new(Noop::new()))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
