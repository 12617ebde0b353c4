//! Composite override source
//!
//! Merges several sources in order; later layers override earlier ones key
//! by key. The merge is all or nothing: if any layer fails the composite
//! fails with that layer's error, so the service keeps its last known values
//! instead of applying a partial set.

use std::sync::Arc;

use async_trait::async_trait;
use ivy_core::{OverrideMap, OverrideSource};
use ivy_domain::Result;

/// Ordered stack of override sources.
#[derive(Default)]
pub struct LayeredOverrideSource {
    layers: Vec<Arc<dyn OverrideSource>>,
}

impl LayeredOverrideSource {
    /// Composite with no layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with higher precedence than all existing ones.
    pub fn with_layer(mut self, layer: Arc<dyn OverrideSource>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Append a layer in place; see [`with_layer`](Self::with_layer).
    pub fn push(&mut self, layer: Arc<dyn OverrideSource>) {
        self.layers.push(layer);
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layer has been added.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[async_trait]
impl OverrideSource for LayeredOverrideSource {
    fn name(&self) -> &str {
        "layered"
    }

    async fn fetch_overrides(&self) -> Result<OverrideMap> {
        let mut merged = OverrideMap::new();
        let mut first_error = None;

        for layer in &self.layers {
            match layer.fetch_overrides().await {
                Ok(flags) => merged.extend(flags),
                Err(err) => {
                    tracing::warn!(
                        source = layer.name(),
                        error = %err,
                        "Override layer failed, discarding merged result"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(merged),
        }
    }
}

impl std::fmt::Debug for LayeredOverrideSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredOverrideSource")
            .field("layers", &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>())
            .finish()
    }
}
