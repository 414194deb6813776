/// A named source of key/value configuration. Entries keep their registration
/// order; a layer is immutable once captured for an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    name: &'static str,
    entries: Vec<(String, String)>,
}

impl ConfigLayer {
    pub fn new(name: &'static str, entries: Vec<(String, String)>) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The ordered collection of layers for one invocation. Later layers override
/// earlier ones at merge time only; registration never mutates prior layers.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    layers: Vec<ConfigLayer>,
}

impl LayerSet {
    pub fn push(&mut self, layer: ConfigLayer) {
        self.layers.push(layer);
    }

    pub fn with(mut self, layer: ConfigLayer) -> Self {
        self.push(layer);
        self
    }

    /// Read-only iteration in precedence order (lowest first).
    pub fn iter(&self) -> impl Iterator<Item = &ConfigLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
