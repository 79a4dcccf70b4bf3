//! File sink
//!
//! Batching sink appending each drained batch item to a file, one line per
//! item. The file is created on first write.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::{decode_settings, TransformConfig};
use crate::registry::{TransformerFactory, TransformerRegistry};
use crate::send::{Invoke, InvokeError, SendConfig, SendTransform};
use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

/// Configuration for the `send_file` sink
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SendFileConfig {
    /// Path of the output file; required
    pub path: String,

    /// Common sink settings
    #[serde(flatten)]
    pub send: SendConfig,
}

struct FileInvoke {
    path: PathBuf,
}

impl Invoke for FileInvoke {
    fn invoke<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)
                .await
                .map_err(|err| InvokeError::unavailable(err.to_string()))?;

            file.write_all(payload)
                .await
                .map_err(|err| InvokeError::unavailable(err.to_string()))?;
            file.write_all(b"\n")
                .await
                .map_err(|err| InvokeError::unavailable(err.to_string()))?;
            file.flush()
                .await
                .map_err(|err| InvokeError::unavailable(err.to_string()))?;

            Ok(())
        })
    }
}

/// Factory for the `send_file` sink
#[derive(Debug, Clone, Copy)]
pub struct FileFactory;

impl TransformerFactory for FileFactory {
    fn create(
        &self,
        registry: &TransformerRegistry,
        config: &TransformConfig,
    ) -> TransformResult<Box<dyn Transformer>> {
        let conf: SendFileConfig = decode_settings(&config.settings)?;
        if conf.path.is_empty() {
            return Err(TransformError::validation("path: missing required option"));
        }

        let aux = registry.build_all(&conf.send.auxiliary_transforms)?;

        Ok(Box::new(SendTransform::new(
            "send_file",
            &conf.send,
            aux,
            Box::new(FileInvoke {
                path: PathBuf::from(&conf.path),
            }),
        )))
    }

    fn name(&self) -> &'static str {
        "send_file"
    }
}
