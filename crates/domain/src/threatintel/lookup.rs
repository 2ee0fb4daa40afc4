//! Domain name preparation applied before every provider lookup.

/// Normalize a captured domain name for lookup.
///
/// Extraction rules often capture surrounding whitespace, and resolvers log
/// fully-qualified names with a trailing dot. Both are stripped; exactly one
/// trailing dot is removed, never more.
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}
