//! Column metadata mapping.
//!
//! Engine-native column descriptors are converted into the portable
//! [`Column`] model here. Two rules apply on top of the 1:1 name passthrough:
//! every native type whose name starts with `timestamp` is tagged with the
//! general portable `timestamp` tag regardless of precision or timezone
//! variant, and values in timezone-naive timestamp columns get an explicit
//! offset suffix appended before they reach the caller's type system.
//!
//! The suffix is the adapter's local offset at read time, not anything
//! derived from the stored value. This widens naive timestamps into a form a
//! timezone-aware parser accepts; it is not a sound timezone derivation and
//! is wrong for data written in another zone. Callers that care pass a fixed
//! offset instead of [`local_offset`].

use std::collections::HashMap;

use time::UtcOffset;

use crate::types::Column;

const TIMESTAMP_PREFIX: &str = "timestamp";

/// Maps a native type name to its portable tag. Overrides win; any
/// `timestamp*` variant collapses to `timestamp`; everything else passes
/// through unchanged.
pub fn portable_tag(native: &str, overrides: &HashMap<String, String>) -> String {
    if let Some(tag) = overrides.get(native) {
        return tag.clone();
    }
    if native.starts_with(TIMESTAMP_PREFIX) {
        return TIMESTAMP_PREFIX.to_string();
    }
    native.to_string()
}

/// True for the engine's timezone-naive timestamp variants.
pub fn is_naive_timestamp(native: &str) -> bool {
    native == "timestamp" || native == "timestamp without time zone"
}

/// Builds portable columns from (name, native type, nullable) descriptors.
pub fn map_columns(
    descriptors: impl IntoIterator<Item = (String, String, bool)>,
    overrides: &HashMap<String, String>,
) -> Vec<Column> {
    descriptors
        .into_iter()
        .map(|(name, native_type, nullable)| {
            let portable_type = portable_tag(&native_type, overrides);
            Column {
                name,
                native_type,
                portable_type,
                nullable,
            }
        })
        .collect()
}

/// Appends the offset suffix to every non-null value of every timezone-naive
/// timestamp column, in place. Row shape must match `columns`.
pub fn normalize_naive_timestamps(
    rows: &mut [Vec<Option<String>>],
    columns: &[Column],
    offset: UtcOffset,
) {
    let suffix = offset_suffix(offset);
    for (index, column) in columns.iter().enumerate() {
        if !is_naive_timestamp(&column.native_type) {
            continue;
        }
        for row in rows.iter_mut() {
            if let Some(Some(value)) = row.get_mut(index) {
                value.push_str(&suffix);
            }
        }
    }
}

/// Renders an offset as the ` +HHMM` / ` -HHMM` suffix form.
pub fn offset_suffix(offset: UtcOffset) -> String {
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!(" {}{:02}{:02}", sign, hours.abs(), minutes.abs())
}

/// The adapter's local offset, falling back to UTC when it cannot be
/// determined (e.g. multi-threaded lookup restrictions).
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::offset;

    fn no_overrides() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn timestamp_variants_collapse_to_timestamp() {
        let overrides = no_overrides();
        assert_eq!(portable_tag("timestamp", &overrides), "timestamp");
        assert_eq!(
            portable_tag("timestamp without time zone", &overrides),
            "timestamp"
        );
        assert_eq!(
            portable_tag("timestamp with time zone", &overrides),
            "timestamp"
        );
        assert_eq!(portable_tag("timestamptz", &overrides), "timestamp");
    }

    #[test]
    fn other_types_pass_through() {
        let overrides = no_overrides();
        assert_eq!(portable_tag("integer", &overrides), "integer");
        assert_eq!(portable_tag("text", &overrides), "text");
    }

    #[test]
    fn override_map_wins() {
        let mut overrides = HashMap::new();
        overrides.insert("int4".to_string(), "integer".to_string());
        assert_eq!(portable_tag("int4", &overrides), "integer");
    }

    #[test]
    fn naive_detection() {
        assert!(is_naive_timestamp("timestamp"));
        assert!(is_naive_timestamp("timestamp without time zone"));
        assert!(!is_naive_timestamp("timestamptz"));
        assert!(!is_naive_timestamp("timestamp with time zone"));
    }

    #[test]
    fn suffix_formatting() {
        assert_eq!(offset_suffix(offset!(UTC)), " +0000");
        assert_eq!(offset_suffix(offset!(+2)), " +0200");
        assert_eq!(offset_suffix(offset!(-5:30)), " -0530");
    }

    #[test]
    fn normalization_touches_only_naive_timestamp_columns() {
        let overrides = no_overrides();
        let columns = map_columns(
            [
                ("at".to_string(), "timestamp".to_string(), true),
                ("at_tz".to_string(), "timestamptz".to_string(), true),
                ("n".to_string(), "integer".to_string(), true),
            ],
            &overrides,
        );
        let mut rows = vec![
            vec![
                Some("2024-05-01 12:00:00".to_string()),
                Some("2024-05-01 12:00:00+00".to_string()),
                Some("7".to_string()),
            ],
            vec![None, None, None],
        ];
        normalize_naive_timestamps(&mut rows, &columns, offset!(+2));

        assert_eq!(rows[0][0].as_deref(), Some("2024-05-01 12:00:00 +0200"));
        assert_eq!(rows[0][1].as_deref(), Some("2024-05-01 12:00:00+00"));
        assert_eq!(rows[0][2].as_deref(), Some("7"));
        assert_eq!(rows[1][0], None);
    }
}
