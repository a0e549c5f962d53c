//! Live editing of required-hit values
//!
//! The host owns the text field; every text change is proposed here as an
//! (old, new) pair. Validation and the recolor decision are pure; applying the
//! new requirement is the only mutation.

use super::accountant::HitAccountant;
use super::state::{TargetFlag, TargetId};
use crate::error::{DrillError, DrillResult};

/// A single text change on one target's requirement field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEdit<'a> {
    pub target_id: TargetId,
    pub old_text: &'a str,
    pub new_text: &'a str,
}

/// What the host should do after proposing an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResult {
    /// Restore `revert_to` and put the caret at the end of the text
    Rejected { revert_to: String },
    /// Field is empty mid-edit; the numeric requirement is unchanged
    Pending,
    /// Requirement updated; recolor the target if `flag` is set
    Applied {
        required: u32,
        flag: Option<TargetFlag>,
    },
}

/// Parse requirement text: zero or more ASCII digits, must fit a `u32`.
///
/// Returns `Ok(None)` for empty text.
pub fn parse_required(text: &str) -> DrillResult<Option<u32>> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DrillError::InvalidRequirement {
            text: text.to_string(),
        });
    }
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<u32>()
        .map(Some)
        .map_err(|_| DrillError::InvalidRequirement {
            text: text.to_string(),
        })
}

/// Recolor decision for a requirement change.
///
/// `current_hits` is the count in effect when the edit happens, so lowering
/// the requirement to or below it marks the target satisfied immediately.
pub fn flag_for_change(old_required: u32, new_required: u32, current_hits: u32) -> Option<TargetFlag> {
    if new_required > old_required {
        Some(TargetFlag::UnderRequirement)
    } else if new_required < old_required && current_hits >= new_required {
        Some(TargetFlag::Satisfied)
    } else {
        None
    }
}

/// Validates requirement edits and pushes them into the [`HitAccountant`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementEditor;

impl RequirementEditor {
    pub fn new() -> Self {
        Self
    }

    /// Validate and apply one edit.
    ///
    /// Errors only for an unregistered target; malformed text is reported as
    /// [`EditResult::Rejected`].
    pub fn propose_edit(
        &self,
        accountant: &mut HitAccountant,
        edit: PendingEdit<'_>,
    ) -> DrillResult<EditResult> {
        let new_required = match parse_required(edit.new_text) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(EditResult::Pending),
            Err(err) => {
                log::debug!("Rejected edit on {}: {}", edit.target_id, err);
                return Ok(EditResult::Rejected {
                    revert_to: edit.old_text.to_string(),
                });
            }
        };

        let current_hits = accountant
            .current_hits(edit.target_id)
            .ok_or(DrillError::UnknownTarget(edit.target_id))?;

        // A previously accepted field always parses; fall back to the model if not
        let old_required = match parse_required(edit.old_text) {
            Ok(value) => value.unwrap_or(0),
            Err(_) => accountant.required_hits(edit.target_id).unwrap_or(0),
        };

        let flag = flag_for_change(old_required, new_required, current_hits);
        accountant.set_required(edit.target_id, new_required)?;

        Ok(EditResult::Applied {
            required: new_required,
            flag,
        })
    }
}
