/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::version
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures for catalog entries and console metadata,
    lenient semantic-version coercion, and the pure comparator
    that selects the highest compatible update candidate.

  Security / Safety Notes:
    Pure data and computation; no I/O performed in this module.

  Dependencies:
    semver for parsed version ordering, serde for wire types.

  Operational Scope:
    Consumed by the catalog/console clients and by the panel
    reducer; never mutates its inputs.

  Revision History:
    2025-05-13 KSL  Authored coercion and comparator logic.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Pure, deterministic comparison with no failure modes
    - Unparseable versions excluded, never fatal
    - Cross-major candidates rejected as incompatible
============================================================*/

use semver::Version;
use serde::{Deserialize, Serialize};

/// One published release of the console package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub version: String,
    pub revision: String,
}

/// Build identifiers reported by the running console.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMetadata {
    pub client_build: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_version_is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_build: Option<String>,
}

impl UiMetadata {
    /// Degraded metadata seeded from the locally known build id,
    /// substituted when the console service cannot be reached.
    pub fn fallback(client_build: &str) -> Self {
        Self {
            client_build: client_build.to_string(),
            ..Self::default()
        }
    }
}

/// A catalog entry annotated with its parsed semantic version.
/// `display` is `None` when the raw string is not coercible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedVersion {
    pub version: String,
    pub revision: String,
    pub display: Option<Version>,
}

impl FormattedVersion {
    /// Preferred string for operator-facing output.
    pub fn display_string(&self) -> String {
        match &self.display {
            Some(parsed) => parsed.to_string(),
            None => self.version.clone(),
        }
    }
}

/// Leniently coerce a version-ish string into a semantic version.
///
/// Accepts a leading `v`, fills missing minor/patch with zero, and
/// keeps pre-release tags when the remainder parses strictly. Build
/// strings such as `master+v1.0.0` resolve to the first embedded
/// dotted number run.
pub fn coerce(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if let Ok(version) = Version::parse(stripped) {
        return Some(version);
    }

    // Strict parse failed; scan for the first embedded number run.
    let bytes = trimmed.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }
        let mut components: Vec<u64> = Vec::with_capacity(3);
        let mut cursor = index;
        while components.len() < 3 {
            let start = cursor;
            while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                cursor += 1;
            }
            match trimmed[start..cursor].parse::<u64>() {
                Ok(number) => components.push(number),
                // Absurdly long digit run; skip this candidate.
                Err(_) => break,
            }
            let has_next = cursor + 1 < bytes.len()
                && bytes[cursor] == b'.'
                && bytes[cursor + 1].is_ascii_digit();
            if has_next {
                cursor += 1;
            } else {
                break;
            }
        }
        if !components.is_empty() {
            return Some(Version::new(
                components[0],
                components.get(1).copied().unwrap_or(0),
                components.get(2).copied().unwrap_or(0),
            ));
        }
        index = cursor.max(index + 1);
    }
    None
}

/// Determine the installed semantic version: the reported package
/// version wins; the server build string is the fallback.
fn parse_current_version(metadata: &UiMetadata) -> Option<Version> {
    metadata
        .package_version
        .as_deref()
        .and_then(coerce)
        .or_else(|| metadata.server_build.as_deref().and_then(coerce))
}

/// Select the highest catalog entry that is a compatible update over
/// the installed version, or `None` when no such entry exists.
///
/// Candidates must coerce to a semantic version sharing the installed
/// major version; the winner must be strictly greater than the
/// installed version. Inputs are never mutated.
pub fn find_available_update(
    catalog: &[CatalogEntry],
    metadata: &UiMetadata,
) -> Option<FormattedVersion> {
    let current = parse_current_version(metadata)?;

    let mut candidates: Vec<FormattedVersion> = catalog
        .iter()
        .map(|entry| FormattedVersion {
            version: entry.version.clone(),
            revision: entry.revision.clone(),
            display: coerce(&entry.version),
        })
        .filter(|candidate| {
            candidate
                .display
                .as_ref()
                .is_some_and(|parsed| parsed.major == current.major)
        })
        .collect();
    candidates.sort_by(|a, b| {
        // Descending; display is Some for every retained candidate.
        b.display.cmp(&a.display)
    });

    let top = candidates.into_iter().next()?;
    if top.display.as_ref().is_some_and(|parsed| *parsed > current) {
        Some(top)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(versions: &[&str]) -> Vec<CatalogEntry> {
        versions
            .iter()
            .map(|version| CatalogEntry {
                version: (*version).to_string(),
                revision: "0".to_string(),
            })
            .collect()
    }

    fn metadata(package_version: &str, server_build: &str) -> UiMetadata {
        UiMetadata {
            client_build: "unit_test+v1.0.0".to_string(),
            package_version: Some(package_version.to_string()),
            package_version_is_default: Some(package_version == "Default"),
            server_build: Some(server_build.to_string()),
        }
    }

    #[test]
    fn coerce_handles_lenient_forms() {
        assert_eq!(coerce("1.5.0"), Some(Version::new(1, 5, 0)));
        assert_eq!(coerce("v2.1"), Some(Version::new(2, 1, 0)));
        assert_eq!(coerce("3"), Some(Version::new(3, 0, 0)));
        assert_eq!(coerce("master+v1.0.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(coerce("Default"), None);
        assert_eq!(coerce(""), None);
    }

    #[test]
    fn coerce_keeps_prerelease_tags() {
        let parsed = coerce("v1.5.0-rc.1").unwrap();
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (1, 5, 0));
        assert!(parsed < Version::new(1, 5, 0));
    }

    #[test]
    fn offers_next_minor_within_current_major() {
        // Default package version resolves through the server build.
        let result = find_available_update(
            &catalog(&["1.0.0", "1.5.0", "2.0.0", "2.1.0"]),
            &metadata("Default", "master+v1.0.0"),
        )
        .unwrap();
        assert_eq!(result.version, "1.5.0");
    }

    #[test]
    fn package_version_takes_precedence_over_server_build() {
        let result = find_available_update(
            &catalog(&["1.0.0", "1.5.0", "2.0.0", "2.1.0"]),
            &metadata("1.1.0", "master+v0.0.0"),
        )
        .unwrap();
        assert_eq!(result.version, "1.5.0");
    }

    #[test]
    fn returns_none_when_no_newer_entry_exists() {
        let result =
            find_available_update(&catalog(&["1.0.0"]), &metadata("1.1.0", "master+v0.0.0"));
        assert!(result.is_none());
    }

    #[test]
    fn rejects_cross_major_candidates() {
        let result =
            find_available_update(&catalog(&["3.0.0"]), &metadata("1.1.0", "master+v0.0.0"));
        assert!(result.is_none());
    }

    #[test]
    fn returns_none_when_no_entry_shares_the_major() {
        let result = find_available_update(
            &catalog(&["2.0.0", "2.1.0", "3.0.0"]),
            &metadata("1.1.0", "master+v0.0.0"),
        );
        assert!(result.is_none());
    }

    #[test]
    fn returns_none_when_nothing_is_parseable() {
        let meta = UiMetadata {
            client_build: "unit_test".to_string(),
            package_version: Some("Default".to_string()),
            package_version_is_default: Some(true),
            server_build: Some("trunk".to_string()),
        };
        let result = find_available_update(&catalog(&["1.5.0"]), &meta);
        assert!(result.is_none());
    }

    #[test]
    fn unparseable_catalog_entries_are_excluded() {
        let result = find_available_update(
            &catalog(&["nightly", "1.5.0"]),
            &metadata("1.1.0", "master+v0.0.0"),
        )
        .unwrap();
        assert_eq!(result.version, "1.5.0");
    }

    #[test]
    fn prerelease_ranks_below_its_release() {
        let result = find_available_update(
            &catalog(&["1.5.0-rc.1", "1.5.0"]),
            &metadata("1.1.0", "master+v0.0.0"),
        )
        .unwrap();
        assert_eq!(result.version, "1.5.0");
    }
}
