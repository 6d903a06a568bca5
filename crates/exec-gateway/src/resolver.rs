use crate::catalog::{CatalogSnapshot, RuntimeVersion};
use crate::error::ResolutionError;
use crate::version::matches_prefix;

/// Pick the runtime for `language` given an optional version constraint.
///
/// - no constraint (or a blank one): the highest version
/// - a constraint equal to a listed version: that version
/// - otherwise the constraint is a numeric prefix (`"3"`, `"3.10"`): the highest version in
///   that family
///
/// A lower, unrelated version is never substituted.
///
/// # Errors
///
/// [`ResolutionError::UnsupportedLanguage`] if the language (or alias) has no runtimes;
/// [`ResolutionError::VersionNotFound`] if nothing matches the constraint.
pub fn resolve<'a>(
    language: &str,
    constraint: Option<&str>,
    snapshot: &'a CatalogSnapshot,
) -> Result<&'a RuntimeVersion, ResolutionError> {
    let versions = snapshot.versions(language);
    let Some(highest) = versions.first() else {
        return Err(ResolutionError::UnsupportedLanguage {
            language: language.trim().to_string(),
        });
    };

    let Some(requested) = constraint.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(highest);
    };

    if let Some(exact) = versions.iter().find(|v| v.version == requested) {
        return Ok(exact);
    }

    // Sorted descending, so the first prefix match is the highest.
    versions
        .iter()
        .find(|v| matches_prefix(&v.version, requested))
        .ok_or_else(|| ResolutionError::VersionNotFound {
            language: highest.language.clone(),
            requested: requested.to_string(),
            available: versions.iter().map(|v| v.version.clone()).collect(),
        })
}
