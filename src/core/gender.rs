use crate::models::{Gender, PreferenceSet};
use std::collections::BTreeSet;
use thiserror::Error;

/// Validation failures during registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Invalid gender entered: {0}. Please enter one of the following: Female, Male, NonBinary, TransF, TransM.")]
    InvalidGender(String),

    #[error("Invalid gender preferences entered: {}. Please enter one of the following: Female, Male, NonBinary, TransF, TransM, All.", .0.join(", "))]
    InvalidPreference(Vec<String>),
}

/// Static synonym table, keyed by folded input
///
/// Folding lowercases, trims, and turns hyphens into spaces, so e.g.
/// "Trans-Female" and "trans female" hit the same row. The five canonical
/// tokens fold onto their own rows, which makes normalization idempotent.
const GENDER_SYNONYMS: &[(&str, Gender)] = &[
    ("f", Gender::Female),
    ("female", Gender::Female),
    ("m", Gender::Male),
    ("male", Gender::Male),
    ("trans f", Gender::TransF),
    ("transf", Gender::TransF),
    ("trans female", Gender::TransF),
    ("transfemale", Gender::TransF),
    ("trans m", Gender::TransM),
    ("transm", Gender::TransM),
    ("trans male", Gender::TransM),
    ("transmale", Gender::TransM),
    ("non binary", Gender::NonBinary),
    ("nonbinary", Gender::NonBinary),
];

/// The wildcard preference token ("any gender")
const WILDCARD: &str = "all";

fn fold(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a raw gender string to a canonical token
///
/// Total over all inputs: known synonyms map to their canonical token,
/// anything else is carried through unchanged in the error so the caller
/// can report exactly what was entered.
pub fn normalize_gender(raw: &str) -> Result<Gender, String> {
    let folded = fold(raw);
    GENDER_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == folded)
        .map(|(_, gender)| *gender)
        .ok_or_else(|| raw.trim().to_string())
}

/// Normalize a list of raw preference tokens into a `PreferenceSet`
///
/// Each element is normalized like a gender; the wildcard "All" is also
/// accepted. Validation collects every element that is neither, so the
/// error lists all offending inputs at once.
pub fn parse_preferences(raw: &[String]) -> Result<PreferenceSet, RegistrationError> {
    let mut genders: BTreeSet<Gender> = BTreeSet::new();
    let mut invalid: Vec<String> = Vec::new();
    let mut wildcard = false;

    for token in raw {
        if fold(token) == WILDCARD {
            wildcard = true;
            continue;
        }
        match normalize_gender(token) {
            Ok(gender) => {
                genders.insert(gender);
            }
            Err(passed_through) => invalid.push(passed_through),
        }
    }

    if !invalid.is_empty() {
        return Err(RegistrationError::InvalidPreference(invalid));
    }

    if wildcard {
        return Ok(PreferenceSet::Any);
    }

    if genders.is_empty() {
        // Preference set must be non-empty; echo the raw input back
        return Err(RegistrationError::InvalidPreference(
            raw.iter().map(|t| t.trim().to_string()).collect(),
        ));
    }

    Ok(PreferenceSet::Genders(genders))
}
