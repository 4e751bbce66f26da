//! Slot-filling dialogue engine
//!
//! One utterance in, one prompt out. The engine walks an [`IntakeScript`] with a cursor
//! that only moves forward, filling a [`CollectedRecord`] as fields are satisfied.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    fields::{FieldKind, FieldSpec, IntakeScript},
    ordinal::parse_cardinal,
    prompts::Prompts,
};

/// Why a choice utterance was not accepted. The same field is asked again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no number found in '{0}'")]
    Unparsable(String),
    #[error("{number} is outside 1..={max}")]
    OutOfRange { number: u64, max: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error("record for call {0} is already finished")]
    AlreadyFinished(String),
}

/// Field values collected during one call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CollectedRecord {
    call_id: String,
    values: Vec<(String, String)>,
    finished: bool,
}

impl CollectedRecord {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            values: Vec::new(),
            finished: false,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Values in collection order.
    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // The cursor never revisits a field, so a key is only ever inserted once.
    fn insert(&mut self, field: &str, value: String) {
        debug_assert!(self.get(field).is_none(), "field '{}' set twice", field);
        if self.finished || self.get(field).is_some() {
            return;
        }
        self.values.push((field.to_string(), value));
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

/// Position in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueCursor {
    next: usize,
    total: usize,
    is_first_turn: bool,
}

impl DialogueCursor {
    fn new(total: usize) -> Self {
        Self {
            next: 0,
            total,
            is_first_turn: true,
        }
    }

    /// Number of fields not yet satisfied.
    pub fn remaining(&self) -> usize {
        self.total - self.next
    }

    pub fn is_first_turn(&self) -> bool {
        self.is_first_turn
    }

    fn advance(&mut self) {
        if self.next < self.total {
            self.next += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// Opening prompt; input was ignored
    Opened,
    /// A field was satisfied and another one is being asked for
    Advanced,
    /// Input did not validate; the same field is asked again
    Rejected(ValidationError),
    /// The last field was satisfied and the record is finished
    Finished,
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub prompt: String,
    /// Always false: the transport decides when the call actually ends
    pub should_stop: bool,
    pub status: TurnStatus,
}

impl Reply {
    fn new(prompt: String, status: TurnStatus) -> Self {
        Self {
            prompt,
            should_stop: false,
            status,
        }
    }
}

pub struct DialogueEngine {
    script: Arc<IntakeScript>,
    prompts: Arc<Prompts>,
    cursor: DialogueCursor,
    record: CollectedRecord,
}

impl DialogueEngine {
    pub fn new(call_id: impl Into<String>, script: Arc<IntakeScript>, prompts: Arc<Prompts>) -> Self {
        let cursor = DialogueCursor::new(script.len());
        Self {
            script,
            prompts,
            cursor,
            record: CollectedRecord::new(call_id),
        }
    }

    pub fn record(&self) -> &CollectedRecord {
        &self.record
    }

    pub fn cursor(&self) -> &DialogueCursor {
        &self.cursor
    }

    /// Field currently being asked for, `None` once finished.
    pub fn current_field(&self) -> Option<&FieldSpec> {
        self.script.fields.get(self.cursor.next)
    }

    /// Consume one utterance and produce the next prompt.
    pub fn respond(&mut self, human_input: &str) -> Result<Reply, DialogueError> {
        if self.record.is_finished() {
            return Err(DialogueError::AlreadyFinished(self.record.call_id.clone()));
        }

        let script = Arc::clone(&self.script);

        if self.cursor.is_first_turn {
            self.cursor.is_first_turn = false;
            let prompt = match script.fields.first() {
                Some(field) => self.prompts.ask(field),
                None => self.prompts.finished(),
            };
            return Ok(Reply::new(prompt, TurnStatus::Opened));
        }

        let Some(current) = script.fields.get(self.cursor.next) else {
            return Err(DialogueError::AlreadyFinished(self.record.call_id.clone()));
        };

        let value = match &current.kind {
            FieldKind::FreeText => human_input.to_string(),
            FieldKind::Choice { noun, options } => {
                let selected = parse_cardinal(human_input)
                    .ok_or_else(|| ValidationError::Unparsable(human_input.to_string()))
                    .and_then(|number| {
                        usize::try_from(number)
                            .ok()
                            .filter(|n| (1..=options.len()).contains(n))
                            .map(|n| &options[n - 1])
                            .ok_or(ValidationError::OutOfRange {
                                number,
                                max: options.len(),
                            })
                    });

                match selected {
                    Ok(option) => option.resolved(),
                    Err(reason) => {
                        debug!(
                            "Call {}: rejected input for '{}': {}",
                            self.record.call_id, current.name, reason
                        );
                        return Ok(Reply::new(
                            self.prompts.invalid_choice(noun),
                            TurnStatus::Rejected(reason),
                        ));
                    }
                }
            }
        };

        debug!(
            "Call {}: collected '{}' = '{}'",
            self.record.call_id, current.name, value
        );
        self.record.insert(&current.name, value);
        self.cursor.advance();

        match script.fields.get(self.cursor.next) {
            Some(next) => Ok(Reply::new(self.prompts.ask(next), TurnStatus::Advanced)),
            None => {
                self.record.finish();
                Ok(Reply::new(self.prompts.finished(), TurnStatus::Finished))
            }
        }
    }
}
