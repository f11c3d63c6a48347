use std::collections::HashMap;

use crate::value::Value;

/// One defined variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub value: Value,
    pub description: String,
}

/// A row of [`Environment::summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub value: String,
    pub description: String,
}

/// The evaluation environment: every variable assigned so far in the
/// document. Reassignment overwrites; there is no history.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, Entry>,
    /// Names in order of first definition.
    order: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).map(|e| &e.value)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Assign `name`. An empty description keeps the previous one.
    pub fn set(&mut self, name: &str, value: Value, description: &str) {
        match self.variables.get_mut(name) {
            Some(entry) => {
                entry.value = value;
                if !description.is_empty() {
                    entry.description = description.to_string();
                }
            }
            None => {
                self.order.push(name.to_string());
                self.variables.insert(
                    name.to_string(),
                    Entry {
                        value,
                        description: description.to_string(),
                    },
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Variable names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Every variable with its formatted value and description, in
    /// definition order.
    pub fn summary(&self, decimals: usize) -> Vec<SummaryRow> {
        self.order
            .iter()
            .filter_map(|name| {
                let entry = self.variables.get(name)?;
                Some(SummaryRow {
                    name: name.clone(),
                    value: entry.value.format(decimals, false),
                    description: entry.description.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassignment_overwrites_in_place() {
        let mut env = Environment::new();
        env.set("a", Value::Scalar(1.0), "first");
        env.set("b", Value::Scalar(2.0), "");
        env.set("a", Value::Scalar(3.0), "");
        assert_eq!(env.get("a"), Some(&Value::Scalar(3.0)));
        assert_eq!(env.entry("a").unwrap().description, "first");
        assert_eq!(env.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn summary_lists_definitions_in_order() {
        let mut env = Environment::new();
        env.set("span", Value::Scalar(12.0), "beam span");
        env.set("w", Value::Scalar(1.25), "");
        let rows = env.summary(2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "span");
        assert_eq!(rows[0].value, "12.00");
        assert_eq!(rows[0].description, "beam span");
    }
}
