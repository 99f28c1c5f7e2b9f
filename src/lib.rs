/*!

On-the-fly decoding of [Simple Binary Encoding](https://github.com/FIXTradingCommunity/fix-simple-binary-encoding)
(SBE) messages.

A schema is compiled into an [`Ir`]: a flat, immutable list of [`Token`]s
per message in which every construct (field, composite, enum, set, group,
variable length data) is bracketed by begin and end tokens. The decode engine
walks those tokens against an encoded buffer and reports every element to a
[`TokenListener`], so arbitrary messages can be inspected without generating
code ahead of time.

## Features

- ✔ Zero-copy: values are handed to listeners as views into the buffer
- ✔ Versioned: fields, groups, and var data newer than the encoder's schema
  version are skipped
- ✔ Safe: every read is bounds checked and declared lengths are validated
  before they are trusted
- ✔ Shareable: an `Ir` is `Send + Sync` and decoding keeps no state between
  calls

## Quick Start

Below a message with a fixed price and a repeating group of legs is
decoded. The group uses a three byte dimension header.

```rust
use sbe_otf::ir::builder::{CompositeType, EncodedType, Field, IrBuilder, Message};
use sbe_otf::{Error, FieldValue, OtfDecoder, PrimitiveType, Token, TokenListener};

#[derive(Default)]
struct Values(Vec<(String, u64)>);

impl<'a> TokenListener<'a> for Values {
    fn on_encoding(
        &mut self,
        field: &'a Token,
        _type_token: &'a Token,
        value: FieldValue<'a>,
        _offset: usize,
    ) -> Result<(), Error> {
        let value = value.scalar().and_then(|x| x.as_u64()).unwrap_or_default();
        self.0.push((field.name().to_string(), value));
        Ok(())
    }
}

# fn main() -> Result<(), Error> {
let dimension = CompositeType::new("smallGroupSize")
    .member(EncodedType::new("blockLength", PrimitiveType::UInt16))
    .member(EncodedType::new("numInGroup", PrimitiveType::UInt8));

let legs = vec![Field::new("leg", 2, EncodedType::new("leg", PrimitiveType::UInt32))];

let ir = IrBuilder::new("trading", 1, 0)
    .message(
        Message::new("Order", 1)
            .with_block_length(8)
            .field(Field::new("price", 1, EncodedType::new("price", PrimitiveType::UInt32)))
            .field(Field::group("legs", 3, legs).with_dimension(dimension)),
    )
    .build()?;

let data = [
    8, 0, 1, 0, 1, 0, 0, 0, // header
    0x39, 0x30, 0, 0, 0, 0, 0, 0, // price and padding
    4, 0, 2, // legs dimension
    7, 0, 0, 0, // leg 0
    9, 0, 0, 0, // leg 1
];

let mut values = Values::default();
let read = OtfDecoder::new(&ir)?.decode(&data, 0, &mut values)?;
assert_eq!(read, 27);
assert_eq!(
    values.0,
    vec![
        (String::from("price"), 12345),
        (String::from("leg"), 7),
        (String::from("leg"), 9),
    ]
);
# Ok(())
# }
```

## Output

With the `json` feature, [`json::JsonPrinter`] renders messages as JSON and
[`json::from_slice`] deserializes them into any serde type. The
[`dump::DumpListener`] writes an offset annotated text dump, useful for
debugging encoders.

## Schema evolution

The acting version is read from each message header (or fixed with
[`OtfDecoderBuilder::acting_version`]). Elements introduced in a later
version than the acting version are treated as absent: no event is emitted
and no bytes are consumed. Group elements are always advanced by the block
length the encoder declared, so data appended by newer encoders is skipped.

*/

mod charset;
pub mod dump;
mod errors;
pub mod ir;
#[cfg(feature = "json")]
pub mod json;
pub mod otf;
pub(crate) mod util;
mod value;

pub use self::charset::CharacterEncoding;
pub use self::errors::*;
pub use self::ir::{ByteOrder, Encoding, Ir, Presence, PrimitiveType, PrimitiveValue, Signal, Token};
pub use self::otf::{HeaderDecoder, MessageHeader, OtfDecoder, OtfDecoderBuilder, TokenListener};
pub use self::value::FieldValue;
