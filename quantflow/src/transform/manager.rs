use super::Transform;
use std::{fmt::Debug, sync::Arc};

/// External supplier of the transform catalog for one pipeline.
///
/// Implementations must return transforms in an order where every consumer is preceded by its
/// producers; the engine does not validate topological order beyond rejecting unresolved
/// handles during registration.
pub trait TransformManager: Debug {
    /// Transform instances in dependency-safe construction order.
    fn build_transforms(&self) -> Vec<Arc<dyn Transform>>;

    /// Lookup a supplied transform by id.
    fn transform_by_id(&self, id: &str) -> Option<Arc<dyn Transform>>;
}

/// [`TransformManager`] over a fixed, pre-ordered list of transforms.
#[derive(Debug, Default)]
pub struct StaticTransformManager {
    transforms: Vec<Arc<dyn Transform>>,
}

impl StaticTransformManager {
    pub fn new(transforms: Vec<Arc<dyn Transform>>) -> Self {
        Self { transforms }
    }
}

impl TransformManager for StaticTransformManager {
    fn build_transforms(&self) -> Vec<Arc<dyn Transform>> {
        self.transforms.clone()
    }

    fn transform_by_id(&self, id: &str) -> Option<Arc<dyn Transform>> {
        self.transforms
            .iter()
            .find(|transform| transform.id() == id)
            .cloned()
    }
}
