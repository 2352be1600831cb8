mod voting_session;

pub use voting_session::*;
