//! Spoken prompt templates
//!
//! Templates use `{placeholder}` markers which are substituted verbatim.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldKind, FieldSpec};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompts {
    /// `{field}`
    #[serde(default = "default_ask_field")]
    pub ask_field: String,
    /// `{noun}`
    #[serde(default = "default_choice_header")]
    pub choice_header: String,
    /// `{number}`, `{label}`, `{value}`
    #[serde(default = "default_choice_line")]
    pub choice_line: String,
    /// `{noun}`
    #[serde(default = "default_choice_instruction")]
    pub choice_instruction: String,
    /// `{noun}`
    #[serde(default = "default_invalid_choice")]
    pub invalid_choice: String,
    #[serde(default = "default_finished")]
    pub finished: String,
}

fn default_ask_field() -> String {
    "Please provide your {field}.".to_string()
}

fn default_choice_header() -> String {
    "Here are your available {noun}s:".to_string()
}

fn default_choice_line() -> String {
    "Number {number}: {label} at {value}".to_string()
}

fn default_choice_instruction() -> String {
    "Please select one of the available {noun}s by providing the corresponding {noun} number."
        .to_string()
}

fn default_invalid_choice() -> String {
    "Invalid {noun} number. Please select a valid {noun}.".to_string()
}

fn default_finished() -> String {
    "Thank you for providing all the information. You will get a text for your appointment \
     shortly when you hang up on this call. Have a good day."
        .to_string()
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            ask_field: default_ask_field(),
            choice_header: default_choice_header(),
            choice_line: default_choice_line(),
            choice_instruction: default_choice_instruction(),
            invalid_choice: default_invalid_choice(),
            finished: default_finished(),
        }
    }
}

/// Substitute `{key}` markers in `template`. Substituted values are never re-scanned;
/// unknown markers are left as written.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let marker = &rest[open..];
        let value = marker.find('}').and_then(|close| {
            let key = &marker[1..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &marker[close + 1..];
            }
            None => {
                out.push('{');
                rest = &marker[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

impl Prompts {
    /// Prompt asking for `field`. Choice fields enumerate their options.
    pub fn ask(&self, field: &FieldSpec) -> String {
        match &field.kind {
            FieldKind::FreeText => fill(&self.ask_field, &[("field", &field.name)]),
            FieldKind::Choice { noun, options } => {
                let listing = options
                    .iter()
                    .enumerate()
                    .map(|(i, option)| {
                        fill(
                            &self.choice_line,
                            &[
                                ("number", &(i + 1).to_string()),
                                ("label", &option.label),
                                ("value", &option.value),
                            ],
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                format!(
                    "{}\n{}\n\n{}",
                    fill(&self.choice_header, &[("noun", noun)]),
                    listing,
                    fill(&self.choice_instruction, &[("noun", noun)])
                )
            }
        }
    }

    pub fn invalid_choice(&self, noun: &str) -> String {
        fill(&self.invalid_choice, &[("noun", noun)])
    }

    pub fn finished(&self) -> String {
        self.finished.clone()
    }
}
