//! Directory entry names: canonical sibling ordering and validation.
//!
//! Siblings under one storage are ordered by UTF-16 length first, then by
//! code-unit comparison after simple uppercasing. Two names comparing
//! `Equal` are the same entry as far as the container is concerned.

use super::consts::MAX_NAME_UNITS;
use super::file::OleError;
use std::cmp::Ordering;

/// Characters that may not appear in an entry name
const ILLEGAL_NAME_CHARS: [char; 4] = ['/', '\\', ':', '!'];

/// Uppercase a single UTF-16 code unit.
///
/// Only units whose uppercase form is a single BMP character change;
/// surrogates and multi-character expansions are left alone.
#[inline]
fn upcase_unit(unit: u16) -> u16 {
    let Some(ch) = char::from_u32(u32::from(unit)) else {
        return unit;
    };
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) if (u as u32) <= 0xFFFF => u as u32 as u16,
        _ => unit,
    }
}

/// Compare two entry names in canonical sibling order.
///
/// # Examples
///
/// ```
/// use loquat::ole::compare_names;
/// use std::cmp::Ordering;
/// assert_eq!(compare_names("Z", "ab"), Ordering::Less);
/// assert_eq!(compare_names("ab", "AB"), Ordering::Equal);
/// assert_eq!(compare_names("ab", "abc"), Ordering::Less);
/// ```
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let len_a = a.encode_utf16().count();
    let len_b = b.encode_utf16().count();
    len_a.cmp(&len_b).then_with(|| {
        a.encode_utf16()
            .map(upcase_unit)
            .cmp(b.encode_utf16().map(upcase_unit))
    })
}

/// Case-insensitive name equality under the canonical ordering
#[inline]
pub fn names_equal(a: &str, b: &str) -> bool {
    compare_names(a, b) == Ordering::Equal
}

/// Validate one path segment for use as an entry name
pub(crate) fn validate_name(name: &str) -> Result<(), OleError> {
    if name.is_empty() {
        return Err(OleError::InvalidPath("empty name segment".to_string()));
    }
    if name.encode_utf16().count() > MAX_NAME_UNITS {
        return Err(OleError::NameTooLong(name.to_string()));
    }
    if name.contains(ILLEGAL_NAME_CHARS) {
        return Err(OleError::IllegalCharacter(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let mut names = vec!["ab", "Z", "abc"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["Z", "ab", "abc"]);
    }

    #[test]
    fn test_same_length_is_case_insensitive() {
        assert_eq!(compare_names("abc", "ABD"), Ordering::Less);
        assert_eq!(compare_names("Zeta", "alfa"), Ordering::Greater);
        assert!(names_equal("__substg1.0_0037001F", "__SUBSTG1.0_0037001f"));
    }

    #[test]
    fn test_length_counts_utf16_units() {
        // U+1F600 takes two UTF-16 units, so it sorts after any single-unit name
        assert_eq!(compare_names("\u{1F600}", "z"), Ordering::Greater);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Stream").is_ok());
        assert!(validate_name(&"a".repeat(31)).is_ok());
        assert!(matches!(validate_name(&"a".repeat(32)), Err(OleError::NameTooLong(_))));
        assert!(matches!(validate_name("a:b"), Err(OleError::IllegalCharacter(_))));
        assert!(matches!(validate_name("a!b"), Err(OleError::IllegalCharacter(_))));
        assert!(matches!(validate_name(""), Err(OleError::InvalidPath(_))));
    }
}
