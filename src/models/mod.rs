// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{pair_key, ActiveMatch, Gender, PreferenceSet, Profile, QueueEntry};
pub use requests::{RegisterRequest, UserActionRequest};
pub use responses::{
    CommandResponse, ErrorResponse, HealthResponse, MatchInfoResponse, MatchResponse,
};
