//! "At least" comparison of free-text version strings.
//!
//! Versions seen in User-Agent strings are rarely clean: `1.6.0_29`,
//! `25.51-b03`, `38.0.2125.111 Safari`, or nothing at all. The comparison
//! tolerates all of these and resolves anything it cannot make sense of to
//! [`SupportVerdict::Unknown`] rather than failing.

use crate::verdict::SupportVerdict;

/// A version comparison whose outcome is pinned.
#[derive(Debug, Clone, Copy)]
pub struct VersionFixture {
    pub candidate: &'static str,
    pub required: &'static str,
    pub expected: SupportVerdict,
}

const fn fixture(
    candidate: &'static str,
    required: &'static str,
    expected: SupportVerdict,
) -> VersionFixture {
    VersionFixture {
        candidate,
        required,
        expected,
    }
}

/// Comparisons checked by [`self_check`] before a scanner is built.
pub const VERSION_FIXTURES: &[VersionFixture] = &[
    fixture("3", "3.5.6", SupportVerdict::NotSupported),
    fixture("3.5.7", "3.5.6", SupportVerdict::Supported),
    fixture("3.4", "3.5.6", SupportVerdict::NotSupported),
    fixture("3.5.7", "3.5", SupportVerdict::Supported),
    fixture("3.5.7", "3.6", SupportVerdict::NotSupported),
    fixture("3.5.7", "3", SupportVerdict::Supported),
    fixture("4.0.4", "2.3", SupportVerdict::Supported),
    fixture("3.5.7", "3.0.9", SupportVerdict::Supported),
    fixture("3.5.7", "3.5.0", SupportVerdict::Supported),
    fixture("3.5.7", "3.6.0", SupportVerdict::NotSupported),
    fixture("38", "38.0.2125", SupportVerdict::Supported),
    fixture("1.3.0_5-test", "1.3.0_7-bobs", SupportVerdict::NotSupported),
    fixture("1.4.1_5-test", "1.4.0_7-bobs", SupportVerdict::Supported),
    fixture("1.4.1_-test", "1.4.0_7-bobs", SupportVerdict::Supported),
];

/// Keep digits, `.` and `_`, turn each run of `_` into a single `.`, then
/// fold `..` into `.` in one pass.
fn clean_version(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut in_separator_run = false;

    for c in raw.chars() {
        match c {
            '0'..='9' | '.' => {
                cleaned.push(c);
                in_separator_run = false;
            }
            '_' => {
                if !in_separator_run {
                    cleaned.push('.');
                }
                in_separator_run = true;
            }
            // Dropped characters do not end a separator run: "1_-_2" is one run.
            _ => {}
        }
    }

    cleaned.replace("..", ".")
}

fn parse_components(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Decide whether `candidate` satisfies the minimum version `required`.
///
/// Components are compared left to right up to the shorter length. When the
/// shared prefix is equal, a longer candidate is supported, and a shorter
/// candidate is supported only if the next required component is zero
/// (`38` satisfies `38.0.2125`, `3` does not satisfy `3.5.6`).
pub fn compare_versions(candidate: &str, required: &str) -> SupportVerdict {
    log::trace!("version compare input: {candidate:?} >= {required:?}");

    let candidate = clean_version(candidate);
    let required = clean_version(required);
    if candidate.is_empty() || required.is_empty() {
        return SupportVerdict::Unknown;
    }

    let candidate = candidate.trim_end_matches(['-', '.']);
    let required = required.trim_end_matches('-').trim_end_matches('.');
    if candidate.is_empty() || required.is_empty() {
        return SupportVerdict::Unknown;
    }

    log::trace!("version compare cleaned: {candidate:?} >= {required:?}");

    let is_numeric = |s: &str| s.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !is_numeric(candidate) || !is_numeric(required) {
        return SupportVerdict::Unknown;
    }

    let (candidate_parts, required_parts) =
        match (parse_components(candidate), parse_components(required)) {
            (Some(c), Some(r)) => (c, r),
            _ => return SupportVerdict::Unknown,
        };

    let mut matched = 0;
    for (have, need) in candidate_parts.iter().zip(required_parts.iter()) {
        if have > need {
            log::trace!("version compare: component {matched} greater");
            return SupportVerdict::Supported;
        }
        if have < need {
            log::trace!("version compare: component {matched} smaller");
            return SupportVerdict::NotSupported;
        }
        matched += 1;
    }

    if matched == candidate_parts.len() && matched == required_parts.len() {
        return SupportVerdict::Supported;
    }

    if required_parts.len() <= candidate_parts.len() {
        // The candidate has an extra component past the equal prefix.
        match candidate_parts.get(matched) {
            Some(_) => SupportVerdict::Supported,
            None => SupportVerdict::NotSupported,
        }
    } else {
        match required_parts.get(matched) {
            Some(&next) if next > 0 => SupportVerdict::NotSupported,
            _ => SupportVerdict::Supported,
        }
    }
}

/// Run every entry of [`VERSION_FIXTURES`] and report all mismatches.
pub fn self_check() -> anyhow::Result<()> {
    let failures: Vec<String> = VERSION_FIXTURES
        .iter()
        .filter_map(|f| {
            let got = compare_versions(f.candidate, f.required);
            (got != f.expected).then(|| {
                format!(
                    "{} vs {}: expected {:?}, got {:?}",
                    f.candidate, f.required, f.expected, got
                )
            })
        })
        .collect();

    if failures.is_empty() {
        log::debug!("version self-check passed ({} fixtures)", VERSION_FIXTURES.len());
        Ok(())
    } else {
        anyhow::bail!("version self-check failed: {}", failures.join("; "))
    }
}
