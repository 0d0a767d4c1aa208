use std::path::Path;
use tracing::debug;

use crate::error::TaskError;
use crate::processor::{ProcessorRegistry, ResolvedProcessor};
use crate::script::Script;

/// A script with its processor looked up, ready to hand to an engine.
///
/// `script` is a copy of the caller's document; `script.config.processor`
/// keeps whatever value was written there.
#[derive(Debug, Clone)]
pub struct ResolvedScript {
    pub script: Script,
    pub processor: Option<ResolvedProcessor>,
}

/// Resolves `config.processor` when it is a path string. Any other value,
/// or no value at all, resolves to no processor.
pub fn resolve_script(
    script: &Script,
    registry: &ProcessorRegistry,
    cwd: &Path,
) -> Result<ResolvedScript, TaskError> {
    let processor = match script.processor_path() {
        Some(raw) => {
            let resolved = registry.resolve(raw, cwd)?;
            debug!(path = %resolved.path.display(), "processor resolved");
            Some(resolved)
        }
        None => None,
    };

    Ok(ResolvedScript {
        script: script.clone(),
        processor,
    })
}
