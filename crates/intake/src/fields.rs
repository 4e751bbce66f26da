//! Field catalog for an intake call
//!
//! The script is the ordered list of fields the caller is asked for. It is fixed when a
//! session is created and never reordered; the dialogue only ever walks it forward.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One selectable entry of a choice field, addressed by its 1-based position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Display name, e.g. the physician
    pub label: String,
    /// Scheduled value attached to the label, e.g. a date and time
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The string stored in the record once this option is picked.
    pub fn resolved(&self) -> String {
        format!("{}: {}", self.label, self.value)
    }
}

/// How a field's value is obtained from the caller's utterance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Utterance is stored as spoken
    FreeText,
    /// Caller picks one option by saying its number
    Choice {
        /// Word used in prompts ("appointment")
        #[serde(default = "default_choice_noun")]
        noun: String,
        options: Vec<ChoiceOption>,
    },
}

fn default_choice_noun() -> String {
    "appointment".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn free_text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::FreeText,
        }
    }

    pub fn choice(
        name: impl Into<String>,
        noun: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Choice {
                noun: noun.into(),
                options,
            },
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, FieldKind::Choice { .. })
    }
}

/// Ordered, immutable sequence of fields plus the two fields that end up in storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntakeScript {
    pub fields: Vec<FieldSpec>,
    /// Field whose value is persisted as the caller's name
    #[serde(default = "default_contact_field")]
    pub contact_field: String,
    /// Field whose value is persisted as the chosen slot
    #[serde(default = "default_booking_field")]
    pub booking_field: String,
}

fn default_contact_field() -> String {
    "first name".to_string()
}

fn default_booking_field() -> String {
    "preferred appointment".to_string()
}

impl Default for IntakeScript {
    fn default() -> Self {
        let mut fields: Vec<FieldSpec> = [
            "first name",
            "last name",
            "date of birth",
            "payer name for your insurance",
            "ID number for your insurance",
            "referral information (if any, and to which physician)",
            "reason for visit",
            "address",
            "contact information",
        ]
        .into_iter()
        .map(FieldSpec::free_text)
        .collect();

        fields.push(FieldSpec::choice(
            "preferred appointment",
            "appointment",
            vec![
                ChoiceOption::new("Mark Zuck", "2030-01-01 10:00:00"),
                ChoiceOption::new("Bill Gates", "2040-01-02 11:00:00"),
                ChoiceOption::new("Elon Musk", "2050-01-03 12:00:00"),
                ChoiceOption::new("Jeff Bezos", "2060-01-04 13:00:00"),
            ],
        ));

        Self {
            fields,
            contact_field: default_contact_field(),
            booking_field: default_booking_field(),
        }
    }
}

impl IntakeScript {
    /// Build and validate a script.
    pub fn new(
        fields: Vec<FieldSpec>,
        contact_field: impl Into<String>,
        booking_field: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let script = Self {
            fields,
            contact_field: contact_field.into(),
            booking_field: booking_field.into(),
        };
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::EmptyScript);
        }

        for (index, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(ConfigError::InvalidField(format!(
                    "field #{} has an empty name",
                    index + 1
                )));
            }
            if self.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(ConfigError::DuplicateField(field.name.clone()));
            }
            if let FieldKind::Choice { options, .. } = &field.kind {
                if options.is_empty() {
                    return Err(ConfigError::InvalidField(format!(
                        "choice field '{}' has no options",
                        field.name
                    )));
                }
            }
        }

        for required in [&self.contact_field, &self.booking_field] {
            if self.field(required).is_none() {
                return Err(ConfigError::UnknownField(required.clone()));
            }
        }

        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
