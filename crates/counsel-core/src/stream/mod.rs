//! Wire protocol of the deliberation stream.
//!
//! Frames look like `data: <payload>\n\n`, where the payload is either the
//! literal `[DONE]` or a JSON object with a `type` field.
//!
//! - `frame`: reassembles frames from arbitrarily chunked bytes (`FrameBuffer`)
//! - `event`: typed events and the forgiving frame decoder (`decode_frame`)

mod event;
mod frame;

pub use event::{DATA_PREFIX, DONE_SENTINEL, Decoded, StepPayload, StreamEvent, decode_frame};
pub use frame::{DEFAULT_MAX_BUFFER_BYTES, FRAME_DELIMITER, FrameBuffer};
