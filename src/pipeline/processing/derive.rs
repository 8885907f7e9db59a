use crate::types::{CanonicalRow, LEG_SLOTS};

/// Count of filled leg slots. Slot position carries meaning, so gaps are
/// allowed anywhere.
pub fn legs_count(leg_ids: &[String; LEG_SLOTS]) -> usize {
    leg_ids.iter().filter(|id| !id.is_empty()).count()
}

/// Recomputes every derived column. Never trusts a value read from a source.
pub fn apply_derived_fields(row: &mut CanonicalRow) {
    row.legs_count = legs_count(&row.leg_ids);
}
