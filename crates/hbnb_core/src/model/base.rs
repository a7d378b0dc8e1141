//! Shared model state and the generic `BaseModel` class.
//!
//! # Responsibility
//! - Assign identity and timestamps on construction.
//! - Hold the open attribute mapping and render it for storage or display.
//!
//! # Invariants
//! - `id` has no setter.
//! - `touch()` strictly advances `updated_at`, even within one clock tick,
//!   until it saturates at `codec::MAX_TIMESTAMP`.

use super::{
    ModelArgs, ModelError, ModelResult, CLASS_KEY, CREATED_AT_KEY, ID_KEY, RESERVED_KEYS,
    UPDATED_AT_KEY,
};
use crate::codec;
use chrono::{Duration, NaiveDateTime};
use serde_json::{Map, Value};
use std::fmt::Formatter;
use uuid::Uuid;

/// Identity, timestamps and open attributes of one model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    attributes: Map<String, Value>,
}

impl ModelState {
    /// Creates state for a brand-new instance.
    ///
    /// `created_at` and `updated_at` are the same instant.
    pub fn fresh() -> Self {
        let now = codec::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            attributes: Map::new(),
        }
    }

    /// Builds state from constructor arguments.
    ///
    /// # Contract
    /// - Positional values fill `fields` in order; surplus values are ignored.
    /// - Keyword `id` is used verbatim and keyword timestamps are decoded.
    /// - `__class__` is consumed and dropped.
    /// - Other keywords become attributes and are applied after positional
    ///   values, so a keyword naming a declared field wins.
    /// - Missing `id` gets a fresh one. A single missing timestamp copies the
    ///   supplied one; when both are missing both are set to now.
    ///
    /// # Errors
    /// - `ModelError::Codec` when a supplied timestamp is malformed.
    /// - `ModelError::MalformedRecord` when `id` is not a string.
    pub fn construct(fields: &[&str], args: &ModelArgs) -> ModelResult<Self> {
        let mut state = Self::fresh();
        for (field, value) in fields.iter().zip(args.positional()) {
            state.attributes.insert((*field).to_string(), value.clone());
        }

        let mut created_at = None;
        let mut updated_at = None;
        for (name, value) in args.keywords() {
            match name.as_str() {
                ID_KEY => {
                    state.id = match value {
                        Value::String(id) => id.clone(),
                        other => {
                            return Err(ModelError::MalformedRecord(format!(
                                "`id` must be a string, got {other}"
                            )));
                        }
                    };
                }
                CREATED_AT_KEY => created_at = Some(codec::decode_timestamp_value(value)?),
                UPDATED_AT_KEY => updated_at = Some(codec::decode_timestamp_value(value)?),
                CLASS_KEY => {}
                _ => {
                    state.attributes.insert(name.clone(), value.clone());
                }
            }
        }

        match (created_at, updated_at) {
            (Some(created), Some(updated)) => {
                state.created_at = created;
                state.updated_at = updated;
            }
            (Some(only), None) | (None, Some(only)) => {
                state.created_at = only;
                state.updated_at = only;
            }
            (None, None) => {}
        }

        Ok(state)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns a string attribute, or `""` when unset or not a string.
    pub fn str_attr(&self, name: &str) -> &str {
        match self.attributes.get(name) {
            Some(Value::String(value)) => value.as_str(),
            _ => "",
        }
    }

    /// Assigns one extra attribute.
    ///
    /// # Errors
    /// - `ModelError::ReservedAttribute` for names in `RESERVED_KEYS`.
    pub fn set_attr<V: Into<Value>>(&mut self, name: &str, value: V) -> ModelResult<()> {
        if RESERVED_KEYS.contains(&name) {
            return Err(ModelError::ReservedAttribute(name.to_string()));
        }
        self.attributes.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Sets a class-declared field; declared names are never reserved.
    pub(crate) fn insert_declared(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Moves `updated_at` to now, or one microsecond past its previous value
    /// when the clock has not advanced. Never passes `codec::MAX_TIMESTAMP`.
    pub(crate) fn touch(&mut self) {
        let next = self.updated_at + Duration::microseconds(1);
        self.updated_at = codec::now().max(next).min(*codec::MAX_TIMESTAMP);
    }

    /// Renders the persistence mapping tagged with `class_name`.
    pub fn to_dict(&self, class_name: &str) -> Map<String, Value> {
        let mut dict = self.attributes.clone();
        dict.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        dict.insert(
            CREATED_AT_KEY.to_string(),
            Value::String(codec::encode_timestamp(self.created_at)),
        );
        dict.insert(
            UPDATED_AT_KEY.to_string(),
            Value::String(codec::encode_timestamp(self.updated_at)),
        );
        dict.insert(CLASS_KEY.to_string(), Value::String(class_name.to_string()));
        dict
    }

    /// Writes `[<class>] (<id>) {...}` with timestamps in native form.
    pub(crate) fn fmt_tagged(&self, class_name: &str, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{class_name}] ({}) {{\"{ID_KEY}\": {:?}, \"{CREATED_AT_KEY}\": {:?}, \"{UPDATED_AT_KEY}\": {:?}",
            self.id, self.id, self.created_at, self.updated_at
        )?;
        for (name, value) in &self.attributes {
            write!(f, ", {name:?}: {value}")?;
        }
        f.write_str("}")
    }
}

model_class!(
    /// Generic model with no declared fields; extras only.
    BaseModel,
    "BaseModel",
    []
);
