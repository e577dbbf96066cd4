mod ring_bytes;
pub mod text;

pub use ring_bytes::RingBytes;
pub use text::{fence_for, strip_ansi, truncate};
