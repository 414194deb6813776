use crate::config::layer::LayerSet;
use crate::config::types::EffectiveConfiguration;

/// Flattens a layer set into the effective configuration for one invocation.
///
/// Layers are applied in precedence order; every entry inserts or overwrites,
/// so the last layer defining a key wins. There is no unset: a later layer can
/// only replace a value, never remove it. Key names are not validated here —
/// unknown keys pass through to the engine, which validates them.
///
/// Merging is deterministic and total: identical layer contents in identical
/// order produce a byte-identical result, and merge itself never fails (a
/// malformed file layer fails earlier, at parse time).
pub fn merge(layers: &LayerSet) -> EffectiveConfiguration {
    let mut effective = EffectiveConfiguration::new();
    for layer in layers.iter() {
        for (key, value) in layer.entries() {
            effective.set(key.clone(), value.clone());
        }
    }
    effective
}
