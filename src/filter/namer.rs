//! Parameter names for filter values.
//!
//! Statement rendering and value binding walk the same filter in the same
//! order with a fresh [`ParameterNamer`], so both sides agree on every name
//! without sharing state. Filter parameters always start with `_` so they
//! never collide with the column parameters of an `UPDATE ... SET`.

use std::collections::{HashMap, HashSet};

use crate::datum::Value;

use super::node::{Comparison, FilterNode};

/// Assigns unique parameter names to comparisons, in visiting order.
///
/// The first comparison on `Age` binds `_Age`; later ones bind `_Age_1`,
/// `_Age_2`, ... List operands bind `_Age_In_0`, `_Age_In_1`, ... and
/// range operands `_Age_Left`/`_Age_Right`. NULL checks bind nothing.
///
/// Names are unique case-insensitively across the whole filter: when a
/// candidate was already issued for another field (`Age_1` next to a
/// second `Age`, or `Last Name` next to `Last_Name`) the suffix keeps
/// counting until every name of the comparison is free.
#[derive(Debug, Default)]
pub struct ParameterNamer {
    counters: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl ParameterNamer {
    /// Creates a namer with no names handed out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names for the values of `comparison`, one per value.
    pub fn names(&mut self, comparison: &Comparison) -> Vec<String> {
        let field = sanitize(comparison.field());
        let mut counter = self
            .counters
            .get(&field.to_ascii_lowercase())
            .copied()
            .unwrap_or(0);
        let names = loop {
            let base = if counter == 0 {
                format!("_{field}")
            } else {
                format!("_{field}_{counter}")
            };
            counter += 1;
            let names = expand(comparison, &base);
            let taken = std::iter::once(&base)
                .chain(&names)
                .any(|name| self.issued.contains(&name.to_ascii_lowercase()));
            if !taken {
                self.issued.insert(base.to_ascii_lowercase());
                break names;
            }
        };
        self.counters.insert(field.to_ascii_lowercase(), counter);
        self.issued
            .extend(names.iter().map(|name| name.to_ascii_lowercase()));
        names
    }
}

/// Parameter names of `comparison` derived from `base`.
fn expand(comparison: &Comparison, base: &str) -> Vec<String> {
    let operator = comparison.operator();
    if comparison.is_null_check() {
        Vec::new()
    } else if operator.is_list() {
        (0..comparison.values().len())
            .map(|i| format!("{base}_In_{i}"))
            .collect()
    } else if operator.is_range() {
        vec![format!("{base}_Left"), format!("{base}_Right")]
    } else {
        vec![base.to_string()]
    }
}

/// Replaces characters that cannot appear in a parameter name with `_`.
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Every `(name, value)` pair a filter binds, in rendering order.
pub fn filter_parameters(filter: &FilterNode) -> Vec<(String, Value)> {
    let mut namer = ParameterNamer::new();
    let mut out = Vec::new();
    for comparison in filter.comparisons() {
        let names = namer.names(comparison);
        out.extend(names.into_iter().zip(comparison.values().iter().cloned()));
    }
    out
}
