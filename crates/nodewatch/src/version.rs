//! Lenient semantic version parsing for node software versions.
//!
//! Nodes report versions such as `v1.2.0`, `1.2` or `1.2.0-rc1`. The leading
//! `v` is dropped and missing minor/patch components are read as zero.

use semver::Version;

/// Parse a node version string, returning `None` when it is not semver-like
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(stripped) {
        return Some(version);
    }

    // Pad `1` and `1.2` to a full triple, keeping any pre-release/build suffix
    let split_at = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(split_at);
    let components = core.split('.').count();
    if core.is_empty() || components >= 3 {
        return None;
    }

    let padded = format!("{core}{}{suffix}", ".0".repeat(3 - components));
    Version::parse(&padded).ok()
}

/// Result of comparing a node's version against the network minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    Current,
    Outdated,
    Unparseable,
}

/// Compare a reported version with an already parsed minimum
pub fn check_version(reported: &str, minimum: &Version) -> VersionCheck {
    match parse_version(reported) {
        Some(version) if version < *minimum => VersionCheck::Outdated,
        Some(_) => VersionCheck::Current,
        None => VersionCheck::Unparseable,
    }
}
