//! Sequential, fan-out-preserving transform application.
//!
//! `apply` is a fold over the transform list: every message produced by
//! stage `i` is fed through stage `i + 1`, in order. A stage emitting zero
//! outputs for an input terminates that branch. The first error aborts the
//! entire call; no partial result is ever returned.

use sluice_message::Message;
use tokio_util::sync::CancellationToken;

use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "apply_test.rs"]
mod tests;

/// Apply an ordered list of transformers to a list of messages.
///
/// # Ordering
///
/// Outputs preserve input order under fan-out: if stage 1 maps `m` to
/// `[m1, m2]` and stage 2 maps any input to `[x, y]`, the result is
/// `[x(m1), y(m1), x(m2), y(m2)]`.
///
/// # Error Handling
///
/// A stage failure is wrapped as [`TransformError::Stage`] with the stage's
/// identifier and index, and the whole call aborts immediately.
///
/// # Cancellation
///
/// The token is checked before each stage; once all branches terminate the
/// remaining stages are skipped.
pub async fn apply(
    cancel: &CancellationToken,
    transformers: &[Box<dyn Transformer>],
    msgs: Vec<Message>,
) -> TransformResult<Vec<Message>> {
    let mut current = msgs;

    for (index, transformer) in transformers.iter().enumerate() {
        if current.is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }

        let mut next = Vec::with_capacity(current.len());
        for msg in current {
            let produced = transformer
                .transform(cancel, msg)
                .await
                .map_err(|source| TransformError::stage(transformer.id(), index, source))?;
            next.extend(produced);
        }

        current = next;
    }

    Ok(current)
}
