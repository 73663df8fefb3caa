//! Semantic version arithmetic for workflow versions

use std::cmp::Ordering;

use semver::Version;

use super::entity::ChangeType;
use crate::domain::validation::ValidationError;

/// Version assigned to the first version of a workflow
pub const INITIAL_VERSION: &str = "1.0.0";

/// Parse a version string, tolerating a leading `v`
pub fn parse_version(version: &str) -> Result<Version, ValidationError> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    Version::parse(trimmed).map_err(|_| ValidationError::InvalidVersion(version.to_string()))
}

/// Compute the version that follows `current` for the given change type.
///
/// Pre-release and build metadata are dropped from the result.
pub fn next_version(current: Option<&str>, change_type: ChangeType) -> Result<String, ValidationError> {
    let Some(current) = current else {
        return Ok(INITIAL_VERSION.to_string());
    };

    let current = parse_version(current)?;

    let next = match change_type {
        ChangeType::Major => Version::new(current.major + 1, 0, 0),
        ChangeType::Minor => Version::new(current.major, current.minor + 1, 0),
        ChangeType::Patch => Version::new(current.major, current.minor, current.patch + 1),
    };

    Ok(next.to_string())
}

/// Order two version strings by semantic-version precedence
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, ValidationError> {
    Ok(parse_version(a)?.cmp_precedence(&parse_version(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_version_from_1_2_3() {
        assert_eq!(next_version(Some("1.2.3"), ChangeType::Patch).unwrap(), "1.2.4");
        assert_eq!(next_version(Some("1.2.3"), ChangeType::Minor).unwrap(), "1.3.0");
        assert_eq!(next_version(Some("1.2.3"), ChangeType::Major).unwrap(), "2.0.0");
    }

    #[test]
    fn test_first_version() {
        assert_eq!(next_version(None, ChangeType::Major).unwrap(), "1.0.0");
        assert_eq!(next_version(None, ChangeType::Patch).unwrap(), "1.0.0");
    }

    #[test]
    fn test_multi_digit_components() {
        assert_eq!(next_version(Some("9.19.99"), ChangeType::Patch).unwrap(), "9.19.100");
        assert_eq!(next_version(Some("9.19.99"), ChangeType::Minor).unwrap(), "9.20.0");
        assert_eq!(next_version(Some("v10.0.4"), ChangeType::Major).unwrap(), "11.0.0");
    }

    #[test]
    fn test_prerelease_is_dropped() {
        assert_eq!(next_version(Some("1.4.0-rc.1"), ChangeType::Patch).unwrap(), "1.4.1");
    }

    #[test]
    fn test_invalid_version() {
        assert_eq!(
            next_version(Some("one.two"), ChangeType::Patch),
            Err(ValidationError::InvalidVersion("one.two".to_string()))
        );
    }

    #[test]
    fn test_compare_is_numeric_not_lexical() {
        assert_eq!(compare_versions("1.10.0", "1.9.0").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "10.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "v1.0.0").unwrap(), Ordering::Equal);
    }
}
