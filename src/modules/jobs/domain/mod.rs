pub mod entities;
pub mod rejection;
pub mod value_objects;

pub use entities::{JobHandle, ResolvedLocation};
pub use rejection::classify_rejection;
pub use value_objects::{JobState, PollPolicy, PollPolicyTable};
