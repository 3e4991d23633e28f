use crate::{OutputHandle, TimeFrame, collection::FnvIndexMap, session::SessionRange};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// Runtime configuration of one transform instance: identity, timeframe, wired inputs, the
/// untyped option bag, and an optional trading session window.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransformConfig {
    pub id: SmolStr,
    pub timeframe: TimeFrame,
    /// Ordered upstream output handles. Empty means the transform is a root and reads base
    /// data directly.
    pub inputs: Vec<OutputHandle>,
    pub options: FnvIndexMap<SmolStr, Value>,
    pub session: Option<SessionRange>,
}

impl TransformConfig {
    pub fn new(id: impl Into<SmolStr>, timeframe: TimeFrame) -> Self {
        Self {
            id: id.into(),
            timeframe,
            inputs: Vec::new(),
            options: FnvIndexMap::default(),
            session: None,
        }
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = OutputHandle>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    pub fn with_option(mut self, key: impl Into<SmolStr>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn with_session(mut self, session: SessionRange) -> Self {
        self.session = Some(session);
        self
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Whether the engine must slice input tables to the trading session before applying the
    /// transform.
    ///
    /// An explicit [`SessionRange`] is the preferred signal; absent one, the presence of a
    /// `"session"` option key is treated as an opt-in. When only the option key is set and no
    /// range can be resolved, the engine warns and skips slicing.
    pub fn requires_session(&self) -> bool {
        self.session.is_some() || self.options.contains_key("session")
    }
}
