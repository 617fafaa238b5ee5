//! Field visibility: conditional rendering.
//!
//! Pure functions of `(field, values)`. The validation engine and the
//! renderer both call these and must agree, so nothing here reads clocks,
//! caches, or any state outside its arguments.

use crate::schema::{FieldDefinition, Section};

use super::value::FormValues;

/// Whether `field` is currently active.
///
/// - No condition: always visible.
/// - With a condition: the dependency's value (its `selected_value` for
///   allow-other pairs, each element for lists) must be a member of the
///   condition's target set.
/// - A dependency that is unset, empty, or structured never matches.
/// - A condition the registry marked dangling never matches, even if the
///   values carry an entry under the missing key.
pub fn is_visible(field: &FieldDefinition, values: &FormValues) -> bool {
    let Some(condition) = &field.condition else {
        return true;
    };
    if condition.dangling {
        return false;
    }
    let targets = condition.value.to_set();
    values
        .get(&condition.depends_on)
        .condition_values()
        .into_iter()
        .any(|v| targets.contains(v))
}

/// The section's fields that are currently visible, in declared order.
pub fn visible_fields<'a>(
    section: &'a Section,
    values: &'a FormValues,
) -> impl Iterator<Item = &'a FieldDefinition> + 'a {
    section.fields.iter().filter(move |f| is_visible(f, values))
}
