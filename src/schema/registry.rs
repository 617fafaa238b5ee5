//! Sections, phases, and the registry that indexes them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

use super::field::FieldDefinition;

/// A navigable step within a phase; the unit of validate/save/advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub fields: Vec<FieldDefinition>,
    /// Shown once after the section saves successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congrats_message: Option<String>,
    /// Step number the persistence API expects for this section.
    /// Falls back to the 1-based position within the phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
}

impl Section {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            fields: Vec::new(),
            congrats_message: None,
            step: None,
        }
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn congrats(mut self, message: impl Into<String>) -> Self {
        self.congrats_message = Some(message.into());
        self
    }

    pub fn step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    /// Look up a field definition by key.
    pub fn get_field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }
}

/// A top-level stage of onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Routing slug, e.g. `business-information`.
    pub slug: String,
    pub title: String,
    pub sections: Vec<Section>,
}

impl Phase {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// All fields of the phase in section order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Step number for the section at `index`.
    pub fn step_number(&self, index: usize) -> Option<u32> {
        let section = self.sections.get(index)?;
        Some(section.step.unwrap_or(index as u32 + 1))
    }

    pub fn section_index(&self, key: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.key == key)
    }
}

/// A position in the wizard: phase index plus section index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionRef {
    pub phase: usize,
    pub section: usize,
}

/// Static description of the whole wizard, indexed for lookups.
///
/// Built once and shared read-only; it has no runtime dependencies.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    phases: Vec<Phase>,
    sections_by_key: HashMap<String, SectionRef>,
    fields_by_key: HashMap<String, SectionRef>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting empty phases, duplicate section keys, and
    /// field keys that repeat within a phase's flattened field set.
    ///
    /// Conditions that reference a key outside their phase are marked
    /// dangling so the field stays hidden whatever the form holds.
    pub fn new(mut phases: Vec<Phase>) -> Result<Self, SchemaError> {
        let mut sections_by_key = HashMap::new();
        let mut fields_by_key = HashMap::new();

        for (phase_idx, phase) in phases.iter().enumerate() {
            if phase.sections.is_empty() {
                return Err(SchemaError::EmptyPhase(phase.slug.clone()));
            }
            let mut phase_keys = HashSet::new();
            for (section_idx, section) in phase.sections.iter().enumerate() {
                let at = SectionRef {
                    phase: phase_idx,
                    section: section_idx,
                };
                if sections_by_key.insert(section.key.clone(), at).is_some() {
                    return Err(SchemaError::DuplicateSectionKey(section.key.clone()));
                }
                for field in &section.fields {
                    if !phase_keys.insert(field.key.as_str()) {
                        return Err(SchemaError::DuplicateFieldKey {
                            phase: phase.slug.clone(),
                            key: field.key.clone(),
                        });
                    }
                    fields_by_key.insert(field.key.clone(), at);
                }
            }
        }

        for phase in &mut phases {
            let keys: HashSet<String> = phase.fields().map(|f| f.key.clone()).collect();
            let fields = phase.sections.iter_mut().flat_map(|s| s.fields.iter_mut());
            for field in fields {
                let Some(condition) = field.condition.as_mut() else {
                    continue;
                };
                condition.dangling = !keys.contains(&condition.depends_on);
                if condition.dangling {
                    tracing::warn!(
                        field = %field.key,
                        depends_on = %condition.depends_on,
                        "Condition references an unknown field; field will stay hidden"
                    );
                }
            }
        }

        Ok(Self {
            phases,
            sections_by_key,
            fields_by_key,
        })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn phase_by_slug(&self, slug: &str) -> Result<(usize, &Phase), SchemaError> {
        self.phases
            .iter()
            .enumerate()
            .find(|(_, p)| p.slug == slug)
            .ok_or_else(|| SchemaError::PhaseNotFound(slug.to_string()))
    }

    pub fn section(&self, at: SectionRef) -> Option<&Section> {
        self.phases.get(at.phase)?.sections.get(at.section)
    }

    pub fn locate_section(&self, key: &str) -> Result<SectionRef, SchemaError> {
        self.sections_by_key
            .get(key)
            .copied()
            .ok_or_else(|| SchemaError::SectionNotFound(key.to_string()))
    }

    /// Find a field definition anywhere in the wizard.
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        let at = self.fields_by_key.get(key)?;
        self.section(*at)?.get_field(key)
    }

    /// Every field definition, in phase then section order.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.phases.iter().flat_map(|p| p.fields())
    }

    pub fn step_number(&self, at: SectionRef) -> Option<u32> {
        self.phases.get(at.phase)?.step_number(at.section)
    }

    pub fn is_last(&self, at: SectionRef) -> bool {
        match self.phases.get(at.phase) {
            Some(phase) => {
                at.phase + 1 == self.phases.len() && at.section + 1 == phase.sections.len()
            }
            None => false,
        }
    }

    /// Fields whose condition names a key that does not exist in the same phase.
    ///
    /// Such fields are always hidden by the visibility evaluator.
    pub fn dangling_conditions(&self) -> Vec<(String, String)> {
        self.all_fields()
            .filter_map(|field| {
                let condition = field.condition.as_ref()?;
                condition
                    .dangling
                    .then(|| (field.key.clone(), condition.depends_on.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldDefinition;

    fn two_phase_schema() -> Vec<Phase> {
        vec![
            Phase::new("first", "First")
                .section(
                    Section::new("a", "A")
                        .field(FieldDefinition::short_text("name", "Name"))
                        .step(1),
                )
                .section(Section::new("b", "B").field(FieldDefinition::short_text("city", "City"))),
            Phase::new("second", "Second").section(
                Section::new("c", "C").field(FieldDefinition::short_text("title", "Title")),
            ),
        ]
    }

    #[test]
    fn indexes_sections_and_fields() {
        let registry = SchemaRegistry::new(two_phase_schema()).unwrap();
        assert_eq!(
            registry.locate_section("c").unwrap(),
            SectionRef { phase: 1, section: 0 }
        );
        assert_eq!(registry.field("city").unwrap().label, "City");
        assert!(registry.field("missing").is_none());
    }

    #[test]
    fn step_number_falls_back_to_position() {
        let registry = SchemaRegistry::new(two_phase_schema()).unwrap();
        assert_eq!(registry.step_number(SectionRef { phase: 0, section: 0 }), Some(1));
        assert_eq!(registry.step_number(SectionRef { phase: 0, section: 1 }), Some(2));
        assert_eq!(registry.step_number(SectionRef { phase: 0, section: 5 }), None);
    }

    #[test]
    fn rejects_duplicate_field_within_phase() {
        let phases = vec![Phase::new("p", "P")
            .section(Section::new("a", "A").field(FieldDefinition::short_text("x", "X")))
            .section(Section::new("b", "B").field(FieldDefinition::short_text("x", "X again")))];
        assert_eq!(
            SchemaRegistry::new(phases).unwrap_err(),
            SchemaError::DuplicateFieldKey {
                phase: "p".into(),
                key: "x".into()
            }
        );
    }

    #[test]
    fn rejects_empty_phase() {
        let err = SchemaRegistry::new(vec![Phase::new("empty", "Empty")]).unwrap_err();
        assert_eq!(err, SchemaError::EmptyPhase("empty".into()));
    }

    #[test]
    fn reports_dangling_conditions() {
        let phases = vec![Phase::new("p", "P").section(
            Section::new("a", "A")
                .field(FieldDefinition::short_text("x", "X").visible_when("ghost", &["yes"])),
        )];
        let registry = SchemaRegistry::new(phases).unwrap();
        assert_eq!(
            registry.dangling_conditions(),
            vec![("x".to_string(), "ghost".to_string())]
        );
        assert!(registry.field("x").unwrap().condition.as_ref().unwrap().dangling);
    }

    #[test]
    fn condition_on_another_phase_is_dangling() {
        let phases = vec![
            Phase::new("p", "P").section(
                Section::new("a", "A").field(FieldDefinition::short_text("kind", "Kind")),
            ),
            Phase::new("q", "Q").section(
                Section::new("b", "B")
                    .field(
                        FieldDefinition::short_text("detail", "Detail")
                            .visible_when("kind", &["x"]),
                    )
                    .field(
                        FieldDefinition::short_text("note", "Note").visible_when("detail", &["y"]),
                    ),
            ),
        ];
        let registry = SchemaRegistry::new(phases).unwrap();
        assert_eq!(
            registry.dangling_conditions(),
            vec![("detail".to_string(), "kind".to_string())]
        );
        assert!(!registry.field("note").unwrap().condition.as_ref().unwrap().dangling);
    }

    #[test]
    fn last_section_detection() {
        let registry = SchemaRegistry::new(two_phase_schema()).unwrap();
        assert!(registry.is_last(SectionRef { phase: 1, section: 0 }));
        assert!(!registry.is_last(SectionRef { phase: 0, section: 1 }));
    }
}
