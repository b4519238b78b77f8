//! Converting several archives in sequence.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::export::ConversionOutput;
use crate::options::ConversionOptions;

/// Shared flag that stops a batch between documents.
///
/// Clones share the flag, so one can be handed to a signal handler while
/// the batch holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Convert each input file in order.
///
/// The token is checked before each document; a conversion already in
/// progress runs to completion. The result has one entry per input that was
/// started, so it is shorter than `inputs` when the batch was cancelled.
pub fn convert_all<P: AsRef<Path>>(
    inputs: &[P],
    options: &ConversionOptions,
    cancel: &CancelToken,
) -> Vec<Result<ConversionOutput>> {
    let mut results = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(remaining = inputs.len() - index, "batch cancelled");
            break;
        }
        let path = input.as_ref();
        tracing::debug!(path = %path.display(), "converting");

        let result = crate::convert_file(path, options);
        if let Err(e) = &result {
            tracing::warn!(path = %path.display(), "conversion failed: {e}");
        }
        results.push(result);
    }

    results
}
