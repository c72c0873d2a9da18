// Core algorithm exports
pub mod compat;
pub mod gender;
pub mod matchmaker;

pub use compat::{is_eligible, mutually_compatible};
pub use gender::{normalize_gender, parse_preferences, RegistrationError};
pub use matchmaker::{ClosedMatch, MatchError, MatchMaker, MatchOutcome, Registration};
