//! On-the-fly decoding of encoded messages against an [`Ir`](crate::Ir)
//!
//! The [`HeaderDecoder`] reads the routing metadata at the front of a
//! message, the template id selects the message's tokens, and the decode
//! engine walks those tokens against the buffer, reporting each element to a
//! [`TokenListener`]. Nothing is generated ahead of time.

mod decoder;
mod header;
mod listener;

pub use self::decoder::{decode_message, OtfDecoder, OtfDecoderBuilder, DEFAULT_MAX_DEPTH};
pub use self::header::{HeaderDecoder, MessageHeader};
pub use self::listener::{set_choices, TokenListener};
