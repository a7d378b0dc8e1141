//! `City` model class.
//!
//! `state_id` references a `State` id by value only; nothing checks that the
//! referenced state exists.

use serde_json::Value;

model_class!(
    /// City belonging to one `State`.
    City,
    "City",
    ["state_id", "name"]
);

impl City {
    /// Returns the owning state id, or `""` when unset.
    pub fn state_id(&self) -> &str {
        self.state.str_attr("state_id")
    }

    pub fn set_state_id(&mut self, state_id: impl Into<String>) {
        self.state
            .insert_declared("state_id", Value::String(state_id.into()));
    }

    /// Returns the city name, or `""` when unset.
    pub fn name(&self) -> &str {
        self.state.str_attr("name")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.state.insert_declared("name", Value::String(name.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::City;
    use crate::model::{Model, ModelArgs, ModelClass};

    #[test]
    fn declared_fields_stay_out_of_to_dict_until_assigned() {
        let mut city = City::new();
        assert_eq!(city.name(), "");
        assert_eq!(city.state_id(), "");
        assert!(!city.to_dict().contains_key("name"));

        city.set_name("Mombasa");
        assert_eq!(city.to_dict()["name"], "Mombasa");
    }

    #[test]
    fn positional_values_follow_declaration_order() {
        let city = City::construct(&ModelArgs::from_positional(["st-1", "Kisumu", "ignored"]))
            .unwrap();
        assert_eq!(city.state_id(), "st-1");
        assert_eq!(city.name(), "Kisumu");
        assert_eq!(city.state().attributes().len(), 2);
    }
}
