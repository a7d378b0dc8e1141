//! Class-tag to factory registry used when reloading stored records.

use crate::model::city::City;
use crate::model::state::State;
use crate::model::{BaseModel, Model, ModelArgs, ModelClass, ModelError, ModelResult};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Rebuilds one boxed model from constructor arguments.
pub type ModelFactory = fn(&ModelArgs) -> ModelResult<Box<dyn Model>>;

/// Class registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRegistryError {
    InvalidClassName(String),
    DuplicateClass(String),
}

impl Display for ClassRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidClassName(name) => write!(f, "model class name is invalid: `{name}`"),
            Self::DuplicateClass(name) => write!(f, "model class already registered: `{name}`"),
        }
    }
}

impl Error for ClassRegistryError {}

/// Known model classes keyed by their serialized tag.
#[derive(Clone, Default)]
pub struct ClassRegistry {
    factories: BTreeMap<&'static str, ModelFactory>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every class shipped by this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert::<BaseModel>();
        registry.insert::<State>();
        registry.insert::<City>();
        registry
    }

    /// Registers one model class under `M::CLASS_NAME`.
    ///
    /// # Errors
    /// - `InvalidClassName` when the tag is empty, contains `.` or is not an
    ///   identifier.
    /// - `DuplicateClass` when the tag is already registered.
    pub fn register<M: ModelClass>(&mut self) -> Result<(), ClassRegistryError> {
        if !is_valid_class_name(M::CLASS_NAME) {
            return Err(ClassRegistryError::InvalidClassName(
                M::CLASS_NAME.to_string(),
            ));
        }
        if self.factories.contains_key(M::CLASS_NAME) {
            return Err(ClassRegistryError::DuplicateClass(M::CLASS_NAME.to_string()));
        }
        self.insert::<M>();
        Ok(())
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Returns sorted class tags.
    pub fn class_names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds an instance of the class registered under `class_name`.
    ///
    /// # Errors
    /// - `ModelError::UnresolvedClassTag` for unknown tags.
    /// - Construction errors from the class itself.
    pub fn reconstruct(&self, class_name: &str, args: &ModelArgs) -> ModelResult<Box<dyn Model>> {
        let factory = self
            .factories
            .get(class_name)
            .ok_or_else(|| ModelError::UnresolvedClassTag(class_name.to_string()))?;
        factory(args)
    }

    fn insert<M: ModelClass>(&mut self) {
        self.factories.insert(M::CLASS_NAME, construct_boxed::<M>);
    }
}

impl Debug for ClassRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.class_names())
            .finish()
    }
}

fn construct_boxed<M: ModelClass>(args: &ModelArgs) -> ModelResult<Box<dyn Model>> {
    let model = M::construct(args)?;
    Ok(Box::new(model))
}

fn is_valid_class_name(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
