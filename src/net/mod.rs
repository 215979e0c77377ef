//! Wire formats shared by hosted matches and replays

pub mod codec;
pub mod protocol;

pub use codec::CodecError;
pub use protocol::{ClientMsg, SeatInfo, ServerMsg};
