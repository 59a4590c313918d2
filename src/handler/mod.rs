pub mod identity;
pub mod learn;
pub mod rejection;
pub mod trace;

pub use identity::IdentityPolicy;
pub use learn::{LearnState, fallback_handler, learn_handler, parse_learn_path};
pub use rejection::IngestError;
pub use trace::trace_request;
