//! Constructor arguments shared by every model class.

use serde_json::{Map, Value};

/// Positional and keyword constructor arguments.
///
/// Positional values fill a class's declared fields in order. Keywords carry
/// reconstruction data (`id`, `created_at`, `updated_at`, extras); supplying
/// any keyword makes construction a reconstruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelArgs {
    positional: Vec<Value>,
    keywords: Map<String, Value>,
}

impl ModelArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments made only of positional values.
    pub fn from_positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keywords: Map::new(),
        }
    }

    /// Arguments made only of keywords, e.g. one stored record.
    pub fn from_keywords(keywords: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            keywords,
        }
    }

    /// Appends one positional value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets one keyword value, replacing an earlier one with the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &Map<String, Value> {
        &self.keywords
    }

    /// Returns whether these arguments describe a reconstruction.
    pub fn is_reconstruction(&self) -> bool {
        !self.keywords.is_empty()
    }
}
