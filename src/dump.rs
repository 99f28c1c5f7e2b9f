//! Offset annotated text rendering of decoded messages
//!
//! Each line starts with the byte offset of the value it describes, which
//! makes the output handy for debugging encoders. Lines for brackets that
//! occupy no bytes of their own have a blank offset column.
//!
//! ```text
//!           : Order {
//!          8:   price=uint32:12345
//!           :   legs[2] blockLength=4 {
//!           :     #0 {
//!         19:       leg=uint32:7
//!           :     }
//!           :     #1 {
//!         23:       leg=uint32:9
//!           :     }
//!           :   }
//!           : }
//! ```

use crate::{
    ir::Token,
    otf::{set_choices, TokenListener},
    CharacterEncoding, Error, FieldValue, PrimitiveValue,
};
use std::io::Write;

/// Customizes the text dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    indent_char: u8,
    indent_factor: u8,
    type_prefix: bool,
}

impl DumpOptions {
    /// Creates the structure with default options
    pub fn new() -> Self {
        DumpOptions::default()
    }

    /// The character to indent lines with
    pub fn with_indent_char(mut self, indent_char: u8) -> DumpOptions {
        self.indent_char = indent_char;
        self
    }

    /// The number of indent characters per level of nesting
    pub fn with_indent_factor(mut self, indent_factor: u8) -> DumpOptions {
        self.indent_factor = indent_factor;
        self
    }

    /// Sets if scalar values are prefixed with their primitive type
    pub fn with_type_prefix(mut self, type_prefix: bool) -> DumpOptions {
        self.type_prefix = type_prefix;
        self
    }
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            indent_char: b' ',
            indent_factor: 2,
            type_prefix: true,
        }
    }
}

/// A listener that writes every decode event as a line of text
///
/// ```
/// use sbe_otf::ir::builder::{EncodedType, Field, IrBuilder, Message};
/// use sbe_otf::{dump::DumpListener, OtfDecoder, PrimitiveType};
///
/// # fn main() -> Result<(), sbe_otf::Error> {
/// let ir = IrBuilder::new("example", 1, 0)
///     .message(Message::new("Tick", 1).field(Field::new("px", 1, EncodedType::new("px", PrimitiveType::UInt16))))
///     .build()?;
///
/// let mut out = Vec::new();
/// let mut listener = DumpListener::new(&mut out);
/// OtfDecoder::new(&ir)?.decode(&[2, 0, 1, 0, 1, 0, 0, 0, 7, 0], 0, &mut listener)?;
///
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.contains("         8:   px=uint16:7\n"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DumpListener<W> {
    writer: W,
    options: DumpOptions,
    depth: usize,
}

impl<W> DumpListener<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        DumpListener::with_options(writer, DumpOptions::default())
    }

    pub fn with_options(writer: W, options: DumpOptions) -> Self {
        DumpListener {
            writer,
            options,
            depth: 0,
        }
    }

    /// Consume the listener and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_preamble(&mut self, offset: Option<usize>) -> Result<(), Error> {
        match offset {
            Some(x) => write!(self.writer, "{:>10}: ", x)?,
            None => self.writer.write_all(b"          : ")?,
        }
        self.write_indent()
    }

    fn write_indent(&mut self) -> Result<(), Error> {
        for _ in 0..self.depth * usize::from(self.options.indent_factor) {
            self.writer.write_all(&[self.options.indent_char])?;
        }
        Ok(())
    }

    fn write_open(&mut self, label: &str) -> Result<(), Error> {
        self.write_preamble(None)?;
        writeln!(self.writer, "{} {{", label)?;
        self.depth += 1;
        Ok(())
    }

    fn write_close(&mut self) -> Result<(), Error> {
        self.depth = self.depth.saturating_sub(1);
        self.write_preamble(None)?;
        self.writer.write_all(b"}\n")?;
        Ok(())
    }

    fn write_scalar(&mut self, value: PrimitiveValue) -> Result<(), Error> {
        match value {
            PrimitiveValue::Char(x) => write!(self.writer, "'{}'", char::from(x))?,
            PrimitiveValue::Int(x) => write_int(&mut self.writer, x)?,
            PrimitiveValue::UInt(x) => write_int(&mut self.writer, x)?,
            PrimitiveValue::Float(x) => write!(self.writer, "{}", x)?,
            PrimitiveValue::Double(x) => write!(self.writer, "{}", x)?,
        }
        Ok(())
    }

    fn write_value(&mut self, type_token: &Token, value: FieldValue) -> Result<(), Error> {
        if self.options.type_prefix {
            write!(self.writer, "{}:", value.primitive_type())?;
        }

        if type_token.is_optional_encoding() && value.is_null(type_token.encoding()) {
            self.writer.write_all(b"null")?;
        } else if value.is_char() && type_token.array_length() > 1 {
            let text = value.to_text(character_encoding(type_token));
            write!(self.writer, "'{}'", text)?;
        } else if value.len() == 1 {
            if let Some(x) = value.scalar() {
                self.write_scalar(x)?;
            }
        } else {
            self.writer.write_all(b"[")?;
            for (i, x) in value.iter().enumerate() {
                if i != 0 {
                    self.writer.write_all(b",")?;
                }
                self.write_scalar(x)?;
            }
            self.writer.write_all(b"]")?;
        }

        Ok(())
    }
}

#[cfg(feature = "faster_writer")]
fn write_int<W: Write, I: itoa::Integer>(writer: &mut W, value: I) -> std::io::Result<()> {
    let mut buffer = itoa::Buffer::new();
    writer.write_all(buffer.format(value).as_bytes())
}

#[cfg(not(feature = "faster_writer"))]
fn write_int<W: Write, I: std::fmt::Display>(writer: &mut W, value: I) -> std::io::Result<()> {
    write!(writer, "{}", value)
}

fn character_encoding(token: &Token) -> CharacterEncoding {
    token
        .encoding()
        .character_encoding()
        .and_then(CharacterEncoding::from_name)
        .unwrap_or_default()
}

impl<'a, W> TokenListener<'a> for DumpListener<W>
where
    W: Write,
{
    fn on_begin_message(&mut self, token: &'a Token) -> Result<(), Error> {
        self.write_open(token.name())
    }

    fn on_end_message(&mut self, _token: &'a Token) -> Result<(), Error> {
        self.write_close()?;
        self.writer.flush()?;
        Ok(())
    }

    fn on_encoding(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: FieldValue<'a>,
        offset: usize,
    ) -> Result<(), Error> {
        self.write_preamble(Some(offset))?;
        write!(self.writer, "{}=", field.name())?;
        if type_token.is_constant_encoding() {
            self.writer.write_all(b"const ")?;
        }
        self.write_value(type_token, value)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn on_enum(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: PrimitiveValue,
        valid_value: Option<&'a Token>,
        offset: usize,
    ) -> Result<(), Error> {
        self.write_preamble(Some(offset))?;
        write!(self.writer, "{}={}", field.name(), type_token.name())?;
        match valid_value {
            Some(x) => write!(self.writer, "::{}", x.name())?,
            None => {
                self.writer.write_all(b"(")?;
                self.write_scalar(value)?;
                self.writer.write_all(b")")?;
            }
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn on_bit_set(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: u64,
        choices: &'a [Token],
        offset: usize,
    ) -> Result<(), Error> {
        self.write_preamble(Some(offset))?;
        write!(self.writer, "{}={}{{", field.name(), type_token.name())?;
        for (i, choice) in set_choices(choices, value).enumerate() {
            if i != 0 {
                self.writer.write_all(b"|")?;
            }
            self.writer.write_all(choice.name().as_bytes())?;
        }
        self.writer.write_all(b"}\n")?;
        Ok(())
    }

    fn on_begin_composite(&mut self, field: &'a Token, _type_token: &'a Token) -> Result<(), Error> {
        self.write_open(field.name())
    }

    fn on_end_composite(&mut self, _field: &'a Token, _type_token: &'a Token) -> Result<(), Error> {
        self.write_close()
    }

    fn on_group_header(&mut self, token: &'a Token, num_in_group: u64, block_length: u64) -> Result<(), Error> {
        self.write_preamble(None)?;
        write!(self.writer, "{}[", token.name())?;
        write_int(&mut self.writer, num_in_group)?;
        self.writer.write_all(b"] blockLength=")?;
        write_int(&mut self.writer, block_length)?;
        self.writer.write_all(b" {\n")?;
        self.depth += 1;
        Ok(())
    }

    fn on_begin_group(&mut self, _token: &'a Token, index: u64, _num_in_group: u64) -> Result<(), Error> {
        self.write_open(&format!("#{}", index))
    }

    fn on_end_group(&mut self, _token: &'a Token, _index: u64, _num_in_group: u64) -> Result<(), Error> {
        self.write_close()
    }

    fn on_group_end(&mut self, _token: &'a Token, _num_in_group: u64) -> Result<(), Error> {
        self.write_close()
    }

    fn on_var_data(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        data: &'a [u8],
        offset: usize,
    ) -> Result<(), Error> {
        self.write_preamble(Some(offset))?;
        write!(self.writer, "{}=", field.name())?;
        let is_text = type_token.encoding().primitive_type() == Some(crate::PrimitiveType::Char)
            || type_token.encoding().character_encoding().is_some();
        if is_text {
            let text = character_encoding(type_token).decode(data);
            write!(self.writer, "'{}'", text)?;
        } else {
            write!(self.writer, "bytes[{}]:", data.len())?;
            for byte in data {
                write!(self.writer, "{:02x}", byte)?;
            }
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::{CompositeType, EncodedType, EnumType, Field, IrBuilder, Message};
    use crate::{Ir, OtfDecoder, PrimitiveType};

    fn ir() -> Ir {
        let side = EnumType::new("Side", PrimitiveType::Char)
            .value("Buy", PrimitiveValue::Char(b'B'))
            .value("Sell", PrimitiveValue::Char(b'S'));
        IrBuilder::new("test", 1, 0)
            .message(
                Message::new("Order", 1)
                    .field(Field::new(
                        "symbol",
                        1,
                        EncodedType::new("Symbol", PrimitiveType::Char).with_length(4),
                    ))
                    .field(Field::new("side", 2, side))
                    .field(Field::new(
                        "qty",
                        3,
                        EncodedType::new("qty", PrimitiveType::UInt32).optional(),
                    ))
                    .field(Field::group(
                        "fills",
                        4,
                        vec![Field::new("px", 5, EncodedType::new("px", PrimitiveType::Int16))],
                    ))
                    .field(Field::data("raw", 6).with_var_data_encoding(CompositeType::var_data_encoding())),
            )
            .build()
            .unwrap()
    }

    fn data() -> Vec<u8> {
        let mut data = vec![9, 0, 1, 0, 1, 0, 0, 0];
        data.extend_from_slice(b"MSFT");
        data.push(b'X');
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[2, 0, 1, 0, 0xfe, 0xff]);
        data.extend_from_slice(&[2, 0, 0, 0, 0xab, 0xcd]);
        data
    }

    #[test]
    fn test_dump() {
        let ir = ir();
        let data = data();
        let mut listener = DumpListener::new(Vec::new());
        let read = OtfDecoder::new(&ir).unwrap().decode(&data, 0, &mut listener).unwrap();
        assert_eq!(read, data.len());

        let actual = String::from_utf8(listener.into_inner()).unwrap();
        let expected = "          : Order {
         8:   symbol=char:'MSFT'
        12:   side=Side('X')
        13:   qty=uint32:null
          :   fills[1] blockLength=2 {
          :     #0 {
        21:       px=int16:-2
          :     }
          :   }
        27:   raw=bytes[2]:abcd
          : }
";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_group_is_closed() {
        let ir = ir();
        let mut data = data();
        data[19] = 0;
        data.drain(21..23);
        let mut listener = DumpListener::new(Vec::new());
        OtfDecoder::new(&ir).unwrap().decode(&data, 0, &mut listener).unwrap();

        let actual = String::from_utf8(listener.into_inner()).unwrap();
        assert!(actual.contains("          :   fills[0] blockLength=2 {\n          :   }\n        25:   raw="));
    }

    #[test]
    fn test_without_type_prefix() {
        let ir = ir();
        let data = data();
        let options = DumpOptions::new()
            .with_type_prefix(false)
            .with_indent_char(b'\t')
            .with_indent_factor(1);
        let mut listener = DumpListener::with_options(Vec::new(), options);
        OtfDecoder::new(&ir).unwrap().decode(&data, 0, &mut listener).unwrap();

        let actual = String::from_utf8(listener.into_inner()).unwrap();
        assert!(actual.contains("         8: \tsymbol='MSFT'\n"));
        assert!(actual.contains("        21: \t\t\tpx=-2\n"));
    }
}
