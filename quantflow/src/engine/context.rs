use crate::{
    engine::logger::{ExecutionLogger, PipelineLogger},
    storage::{IntermediateStorage, ResultStorage},
};
use derive_more::Constructor;
use std::sync::Arc;

/// Shared state handed to every executing graph node: the intermediate storage and the
/// pipeline error logger.
#[derive(Debug, Clone, Constructor)]
pub struct ExecutionContext {
    pub storage: Arc<dyn IntermediateStorage>,
    pub logger: Arc<dyn PipelineLogger>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            storage: Arc::new(ResultStorage::new()),
            logger: Arc::new(ExecutionLogger::new()),
        }
    }
}
