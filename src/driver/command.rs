//! Native commands and their parameter sets.

use std::time::Duration;

use crate::datum::Value;

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Plain SQL text.
    #[default]
    Text,
    /// The text names a stored procedure.
    StoredProcedure,
}

/// A named parameter value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name without the dialect prefix.
    pub name: String,
    /// Bound value.
    pub value: Value,
}

/// An ordered, name-addressable parameter set.
///
/// Names are unique (case-insensitive). [`add`](Self::add) expects a new
/// name; [`set`](Self::set) replaces a bound value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `capacity` parameters.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Adds a parameter under a name not bound yet.
    ///
    /// Binding a name twice means two placeholders were given the same
    /// name, so this panics in debug builds. Release builds keep the first
    /// value and log the clash.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let duplicate = self.position(&name).is_some();
        debug_assert!(!duplicate, "parameter {name:?} bound twice");
        if duplicate {
            tracing::warn!(parameter = %name, "duplicate parameter ignored");
            return;
        }
        self.items.push(Parameter {
            name,
            value: value.into(),
        });
    }

    /// Binds `value` to `name`, replacing any value already bound.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.items[index].value = value,
            None => self.items.push(Parameter { name, value }),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes every parameter, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates parameters in binding order.
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A command ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command text.
    pub text: String,
    /// Text interpretation.
    pub kind: CommandKind,
    /// Timeout the driver should enforce.
    pub timeout: Option<Duration>,
    /// Bound parameters.
    pub parameters: Parameters,
}

impl Command {
    /// Creates a text command with no parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CommandKind::Text,
            timeout: None,
            parameters: Parameters::new(),
        }
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the text interpretation.
    pub fn with_kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds a parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.add(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_replace_by_name() {
        let mut params = Parameters::new();
        params.add("Id", 1i64);
        params.add("Name", "a");
        params.set("id", 2i64);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("ID"), Some(&Value::Int64(2)));
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Id", "Name"]);
    }

    #[test]
    #[should_panic(expected = "bound twice")]
    #[cfg(debug_assertions)]
    fn test_adding_a_bound_name_panics() {
        let mut params = Parameters::new();
        params.add("_Age_1", 2i32);
        params.add("_age_1", 3i32);
    }

    #[test]
    fn test_command_builder() {
        let command = Command::new("SELECT 1")
            .with_timeout(Some(Duration::from_secs(5)))
            .bind("x", 1i32);
        assert_eq!(command.kind, CommandKind::Text);
        assert_eq!(command.timeout, Some(Duration::from_secs(5)));
        assert_eq!(command.parameters.get("x"), Some(&Value::Int32(1)));
    }
}
