//! `State` model class.

use serde_json::Value;

model_class!(
    /// Geographic state; parent of `City` records through `City::state_id`.
    State,
    "State",
    ["name"]
);

impl State {
    /// Creates a fresh state with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.set_name(name);
        state
    }

    /// Returns the name, or `""` when it was never assigned.
    pub fn name(&self) -> &str {
        self.state.str_attr("name")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.state.insert_declared("name", Value::String(name.into()));
    }
}
