//! Ghostline full-mode unlock rule

use crate::config::UNLOCK_HOVER_THRESHOLD;
use crate::record::InteractionRecord;

/// Whether full ghostline mode should be (or stay) unlocked.
///
/// True once total skill hovers exceed the default threshold, and stays true
/// after the flag has been set regardless of later counts.
pub fn should_unlock(record: &InteractionRecord) -> bool {
    should_unlock_with(record, UNLOCK_HOVER_THRESHOLD)
}

/// [`should_unlock`] with an explicit hover threshold
pub fn should_unlock_with(record: &InteractionRecord, threshold: u64) -> bool {
    record.is_ghostline_full_mode_unlocked || record.total_skill_hovers() > threshold
}
