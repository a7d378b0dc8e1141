//! Persistable domain models.
//!
//! # Responsibility
//! - Define the shared model state (identity, timestamps, open attributes).
//! - Define the object-safe `Model` contract the storage engine works with.
//! - Declare concrete model classes and their constructor contract.
//!
//! # Invariants
//! - `id` never changes after construction.
//! - `created_at <= updated_at` for every instance created by this crate.
//! - The class tag is derived from the concrete type, never stored as an
//!   attribute.

use crate::codec::CodecError;
use crate::storage::{FileStorage, StorageResult};
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::any::Any;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Generates one concrete model class backed by `ModelState`.
///
/// Declared field names are the positional constructor slots, in order.
macro_rules! model_class {
    ($(#[$meta:meta])* $name:ident, $tag:literal, [$($field:literal),* $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            state: $crate::model::ModelState,
        }

        impl $name {
            /// Creates a fresh instance with a new id and current timestamps.
            pub fn new() -> Self {
                Self {
                    state: $crate::model::ModelState::fresh(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::model::Model for $name {
            fn class_name(&self) -> &'static str {
                $tag
            }

            fn state(&self) -> &$crate::model::ModelState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut $crate::model::ModelState {
                &mut self.state
            }

            fn clone_model(&self) -> Box<dyn $crate::model::Model> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        impl $crate::model::ModelClass for $name {
            const CLASS_NAME: &'static str = $tag;
            const FIELDS: &'static [&'static str] = &[$($field),*];

            fn from_state(state: $crate::model::ModelState) -> Self {
                Self { state }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.state.fmt_tagged($tag, f)
            }
        }
    };
}

pub mod args;
pub mod base;
pub mod city;
pub mod state;

pub use args::ModelArgs;
pub use base::{BaseModel, ModelState};

/// Serialized key holding the model id.
pub const ID_KEY: &str = "id";
/// Serialized key holding the creation timestamp.
pub const CREATED_AT_KEY: &str = "created_at";
/// Serialized key holding the last-save timestamp.
pub const UPDATED_AT_KEY: &str = "updated_at";
/// Serialized key holding the concrete class tag.
pub const CLASS_KEY: &str = "__class__";

/// Attribute names owned by the model itself; never assignable as extras.
pub const RESERVED_KEYS: [&str; 4] = [ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY, CLASS_KEY];

pub type ModelResult<T> = Result<T, ModelError>;

/// Model construction and mutation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A stored timestamp could not be decoded.
    Codec(CodecError),
    /// A stored record has the wrong shape (non-object entry, non-string id).
    MalformedRecord(String),
    /// Caller tried to assign one of `RESERVED_KEYS` as an extra attribute.
    ReservedAttribute(String),
    /// No class is registered under the given tag.
    UnresolvedClassTag(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Codec(err) => write!(f, "{err}"),
            Self::MalformedRecord(message) => write!(f, "malformed model record: {message}"),
            Self::ReservedAttribute(name) => {
                write!(f, "attribute `{name}` is reserved and cannot be assigned")
            }
            Self::UnresolvedClassTag(tag) => write!(f, "unknown model class `{tag}`"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::MalformedRecord(_) => None,
            Self::ReservedAttribute(_) => None,
            Self::UnresolvedClassTag(_) => None,
        }
    }
}

impl From<CodecError> for ModelError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Builds the registry key `"<ClassName>.<id>"`.
pub fn storage_key(class_name: &str, id: &str) -> String {
    format!("{class_name}.{id}")
}

/// Object-safe contract shared by every persistable model.
pub trait Model: Any + Debug + Send {
    /// Concrete class tag, written as `__class__` on serialization.
    fn class_name(&self) -> &'static str;
    fn state(&self) -> &ModelState;
    fn state_mut(&mut self) -> &mut ModelState;
    fn clone_model(&self) -> Box<dyn Model>;
    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> &str {
        self.state().id()
    }

    fn created_at(&self) -> NaiveDateTime {
        self.state().created_at()
    }

    fn updated_at(&self) -> NaiveDateTime {
        self.state().updated_at()
    }

    /// Returns the registry key for this instance.
    fn storage_key(&self) -> String {
        storage_key(self.class_name(), self.id())
    }

    /// Returns the persistence form of this instance.
    ///
    /// Contains `id`, encoded `created_at`/`updated_at`, `__class__` and every
    /// attribute assigned so far. The instance is not modified.
    fn to_dict(&self) -> Map<String, Value> {
        self.state().to_dict(self.class_name())
    }

    fn attr(&self, name: &str) -> Option<&Value> {
        self.state().attr(name)
    }

    /// Assigns one extra attribute.
    ///
    /// # Errors
    /// - `ModelError::ReservedAttribute` for names in `RESERVED_KEYS`.
    fn set_attr<V: Into<Value>>(&mut self, name: &str, value: V) -> ModelResult<()>
    where
        Self: Sized,
    {
        self.state_mut().set_attr(name, value)
    }

    /// Refreshes `updated_at`, registers this instance and flushes the store.
    ///
    /// # Errors
    /// - Flush I/O or serialization errors, unchanged.
    fn save(&mut self, storage: &mut FileStorage) -> StorageResult<()>
    where
        Self: Sized,
    {
        storage.save(self)
    }
}

impl Display for dyn Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.state().fmt_tagged(self.class_name(), f)
    }
}

/// Static side of a concrete model class.
pub trait ModelClass: Model + Clone + Sized {
    const CLASS_NAME: &'static str;
    /// Declared subtype fields, in positional constructor order.
    const FIELDS: &'static [&'static str];

    fn from_state(state: ModelState) -> Self;

    /// Builds an instance from positional and/or keyword arguments.
    ///
    /// Without keywords this is fresh construction; any keyword switches to
    /// reconstruction. See `ModelState::construct` for precedence rules.
    fn construct(args: &ModelArgs) -> ModelResult<Self> {
        ModelState::construct(Self::FIELDS, args).map(Self::from_state)
    }

    /// Rebuilds an instance from its `to_dict()` form.
    fn from_dict(record: &Map<String, Value>) -> ModelResult<Self> {
        Self::construct(&ModelArgs::from_keywords(record.clone()))
    }
}
