//! Streaming infrastructure
//!
//! - Session: create/heartbeat/teardown of the active HLS stream

pub mod session;

pub use session::{
    PollPolicy, SessionOutcome, SessionToken, StreamController, StreamSession, StreamState,
};
