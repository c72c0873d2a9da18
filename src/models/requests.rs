use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration form fields
///
/// Gender and preferences arrive raw, exactly as the host platform's form
/// collected them; normalization and validation happen in the core.
/// Preferences are comma-separated, matching the original form input.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub age: u8,
    pub gender: String,
    #[serde(alias = "gender_preference", rename = "genderPreference")]
    pub gender_preference: String,
    #[serde(default)]
    pub bio: String,
}

impl RegisterRequest {
    /// Split the comma-separated preference field into raw tokens
    pub fn preference_tokens(&self) -> Vec<String> {
        self.gender_preference
            .split(',')
            .map(|token| token.trim().to_string())
            .collect()
    }
}

/// Request carrying only the acting user, shared by find-match,
/// confirm-date, unmatch, reject and leave-queue
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserActionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_tokens_are_trimmed() {
        let req = RegisterRequest {
            user_id: "u1".to_string(),
            name: "Test".to_string(),
            age: 25,
            gender: "Female".to_string(),
            gender_preference: "Male, trans m ,NonBinary".to_string(),
            bio: String::new(),
        };

        assert_eq!(
            req.preference_tokens(),
            vec!["Male", "trans m", "NonBinary"]
        );
    }
}
