//! Stdout sink
//!
//! Batching sink writing each drained batch item to standard output, one
//! line per item. Mostly used for development and demo pipelines.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::config::{decode_settings, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::send::{Invoke, InvokeError, SendConfig, SendTransform};
use crate::{TransformResult, Transformer};

#[cfg(test)]
#[path = "stdout_test.rs"]
mod tests;

struct StdoutInvoke;

impl Invoke for StdoutInvoke {
    fn invoke<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + Send + 'a>> {
        Box::pin(async move {
            println!("{}", String::from_utf8_lossy(payload));
            Ok(())
        })
    }
}

/// Factory for the `send_stdout` sink
#[derive(Debug, Clone, Copy)]
pub struct StdoutFactory;

impl TransformerFactory for StdoutFactory {
    fn create(
        &self,
        registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: SendConfig = decode_settings(&config.settings)?;
        let aux = registry.build_all(&conf.auxiliary_transforms)?;

        Ok(Box::new(SendTransform::new(
            "send_stdout",
            &conf,
            aux,
            Box::new(StdoutInvoke),
        )))
    }

    fn name(&self) -> &'static str {
        "send_stdout"
    }
}
