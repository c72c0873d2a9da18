use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Canonical gender token used internally after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    TransF,
    TransM,
}

impl Gender {
    /// All five canonical tokens, in a fixed order
    pub const ALL: [Gender; 5] = [
        Gender::Female,
        Gender::Male,
        Gender::NonBinary,
        Gender::TransF,
        Gender::TransM,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::NonBinary => "NonBinary",
            Gender::TransF => "TransF",
            Gender::TransM => "TransM",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of partner genders a profile will accept
///
/// Either the wildcard ("All") or a non-empty set of canonical tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferenceSet {
    /// Wildcard: any gender is acceptable
    Any,
    Genders(BTreeSet<Gender>),
}

impl PreferenceSet {
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            PreferenceSet::Any => true,
            PreferenceSet::Genders(set) => set.contains(&gender),
        }
    }
}

/// Registered user profile
///
/// Created and overwritten by registration, keyed by the host platform's
/// stable user identifier. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub preferences: PreferenceSet,
    pub bio: String,
}

/// Entry in the waiting queue
///
/// `gender` and `preferences` are denormalized copies of the profile at
/// enqueue time; re-registration refreshes them in place. `seq` is assigned
/// by the store and fixes both FIFO order and the entry's identity for
/// conditional removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub gender: Gender,
    pub preferences: PreferenceSet,
    #[serde(rename = "enqueuedAt")]
    pub enqueued_at: DateTime<Utc>,
    pub seq: u64,
}

/// An active match between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMatch {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "userA")]
    pub user_a: String,
    #[serde(rename = "userB")]
    pub user_b: String,
    #[serde(rename = "channelRef")]
    pub channel_ref: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ActiveMatch {
    /// The other participant, if `user_id` is part of this match
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if self.user_a == user_id {
            Some(&self.user_b)
        } else if self.user_b == user_id {
            Some(&self.user_a)
        } else {
            None
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }
}

/// Normalized key for an unordered user pair
///
/// Rejection records are symmetric: (A, B) and (B, A) are the same pair.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_set_wildcard_accepts_everything() {
        let prefs = PreferenceSet::Any;
        for gender in Gender::ALL {
            assert!(prefs.accepts(gender));
        }
    }

    #[test]
    fn test_preference_set_explicit() {
        let prefs = PreferenceSet::Genders([Gender::Female, Gender::TransF].into());
        assert!(prefs.accepts(Gender::Female));
        assert!(prefs.accepts(Gender::TransF));
        assert!(!prefs.accepts(Gender::Male));
    }

    #[test]
    fn test_partner_of() {
        let m = ActiveMatch {
            match_id: Uuid::new_v4(),
            user_a: "a".to_string(),
            user_b: "b".to_string(),
            channel_ref: "chan-1".to_string(),
            created_at: Utc::now(),
        };

        assert_eq!(m.partner_of("a"), Some("b"));
        assert_eq!(m.partner_of("b"), Some("a"));
        assert_eq!(m.partner_of("c"), None);
    }

    #[test]
    fn test_pair_key_is_symmetric() {
        assert_eq!(pair_key("x", "y"), pair_key("y", "x"));
    }
}
