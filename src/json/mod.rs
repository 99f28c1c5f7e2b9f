//! Renders decoded messages as JSON
//!
//! Fields appear in schema order. Composites become objects, groups become
//! arrays of objects, enums are written by name (or as the raw value when
//! the schema doesn't declare it), sets become arrays of the choices that
//! are on, and optional fields holding their null value become `null`.
//!
//! ```
//! use sbe_otf::ir::builder::{EncodedType, Field, IrBuilder, Message};
//! use sbe_otf::{json::{JsonOptions, JsonPrinter}, PrimitiveType};
//!
//! # fn main() -> Result<(), sbe_otf::Error> {
//! let ir = IrBuilder::new("example", 1, 0)
//!     .message(
//!         Message::new("Tick", 3)
//!             .field(Field::new("px", 1, EncodedType::new("px", PrimitiveType::UInt16)))
//!             .field(Field::new("venue", 2, EncodedType::new("venue", PrimitiveType::Char).with_length(4))),
//!     )
//!     .build()?;
//!
//! let options = JsonOptions::new().with_prettyprint(false);
//!
//! // These are the default options
//! assert_eq!(options, JsonOptions::default());
//!
//! let data = [6, 0, 3, 0, 1, 0, 0, 0, 0x10, 0x00, b'X', b'N', b'Y', b'S'];
//! let actual = JsonPrinter::new(&ir).with_options(options).print(&data, 0)?;
//! assert_eq!(actual, r#"{"px":16,"venue":"XNYS"}"#);
//! # Ok(())
//! # }
//! ```

use crate::{
    ir::Token,
    otf::{set_choices, OtfDecoder, TokenListener},
    CharacterEncoding, Error, FieldValue, Ir, PrimitiveType, PrimitiveValue,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::io::Write;

/// Customizes the JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonOptions {
    /// Controls if the JSON should be pretty printed
    pretty: bool,

    /// Controls if var data without a character encoding is rendered as
    /// text instead of an array of bytes
    lossy_data: bool,
}

impl JsonOptions {
    /// Creates the structure with default options
    pub fn new() -> Self {
        JsonOptions::default()
    }

    /// Sets if the JSON should be pretty printed or minified
    pub fn with_prettyprint(mut self, pretty: bool) -> JsonOptions {
        self.pretty = pretty;
        self
    }

    /// Sets if opaque var data should be rendered as (lossy) UTF-8 text
    pub fn with_lossy_data(mut self, lossy_data: bool) -> JsonOptions {
        self.lossy_data = lossy_data;
        self
    }
}

#[derive(Debug)]
enum Frame {
    Object(Option<String>, Map<String, Value>),
    Group(String, Vec<Value>),
}

/// A listener that accumulates each decoded message into a JSON value
#[derive(Debug, Default)]
pub struct JsonListener {
    options: JsonOptions,
    stack: Vec<Frame>,
    messages: Vec<Value>,
}

impl JsonListener {
    pub fn new() -> Self {
        JsonListener::default()
    }

    pub fn with_options(options: JsonOptions) -> Self {
        JsonListener {
            options,
            ..JsonListener::default()
        }
    }

    /// The most recently completed message. A decode of unbracketed tokens
    /// never completes a message, so whatever was accumulated is returned.
    pub fn into_value(mut self) -> Option<Value> {
        while self.stack.len() > 1 {
            self.pop_into_parent();
        }

        match self.stack.pop() {
            Some(Frame::Object(_, map)) => Some(Value::Object(map)),
            Some(Frame::Group(_, items)) => Some(Value::Array(items)),
            None => self.messages.pop(),
        }
    }

    /// Every completed message, in decode order
    pub fn into_messages(self) -> Vec<Value> {
        self.messages
    }

    fn insert(&mut self, key: &str, value: Value) {
        if self.stack.is_empty() {
            self.stack.push(Frame::Object(None, Map::new()));
        }

        match self.stack.last_mut() {
            Some(Frame::Object(_, map)) => {
                map.insert(String::from(key), value);
            }
            Some(Frame::Group(_, items)) => items.push(value),
            None => {}
        }
    }

    fn pop_into_parent(&mut self) {
        match self.stack.pop() {
            Some(Frame::Object(Some(key), map)) => self.insert(&key, Value::Object(map)),
            Some(Frame::Object(None, map)) => match self.stack.last_mut() {
                Some(Frame::Group(_, items)) => items.push(Value::Object(map)),
                _ => self.messages.push(Value::Object(map)),
            },
            Some(Frame::Group(key, items)) => self.insert(&key, Value::Array(items)),
            None => {}
        }
    }

    fn field_value(&self, type_token: &Token, value: FieldValue) -> Value {
        if type_token.is_optional_encoding() && value.is_null(type_token.encoding()) {
            return Value::Null;
        }

        if value.is_char() {
            let encoding = character_encoding(type_token).unwrap_or_default();
            return Value::String(value.to_text(encoding).into_owned());
        }

        if type_token.array_length() == 1 {
            return value.scalar().map_or(Value::Null, scalar);
        }

        Value::Array(value.iter().map(scalar).collect())
    }
}

fn character_encoding(token: &Token) -> Option<CharacterEncoding> {
    token
        .encoding()
        .character_encoding()
        .and_then(CharacterEncoding::from_name)
}

fn scalar(value: PrimitiveValue) -> Value {
    match value {
        PrimitiveValue::Char(x) => Value::String(char::from(x).to_string()),
        PrimitiveValue::Int(x) => Value::from(x),
        PrimitiveValue::UInt(x) => Value::from(x),
        PrimitiveValue::Float(x) => serde_json::Number::from_f64(f64::from(x)).map_or(Value::Null, Value::Number),
        PrimitiveValue::Double(x) => serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number),
    }
}

impl<'a> TokenListener<'a> for JsonListener {
    fn on_begin_message(&mut self, _token: &'a Token) -> Result<(), Error> {
        self.stack.push(Frame::Object(None, Map::new()));
        Ok(())
    }

    fn on_end_message(&mut self, _token: &'a Token) -> Result<(), Error> {
        while !self.stack.is_empty() {
            self.pop_into_parent();
        }
        Ok(())
    }

    fn on_encoding(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: FieldValue<'a>,
        _offset: usize,
    ) -> Result<(), Error> {
        let value = self.field_value(type_token, value);
        self.insert(field.name(), value);
        Ok(())
    }

    fn on_enum(
        &mut self,
        field: &'a Token,
        _type_token: &'a Token,
        value: PrimitiveValue,
        valid_value: Option<&'a Token>,
        _offset: usize,
    ) -> Result<(), Error> {
        let value = match valid_value {
            Some(x) => Value::String(x.name().to_owned()),
            None => scalar(value),
        };
        self.insert(field.name(), value);
        Ok(())
    }

    fn on_bit_set(
        &mut self,
        field: &'a Token,
        _type_token: &'a Token,
        value: u64,
        choices: &'a [Token],
        _offset: usize,
    ) -> Result<(), Error> {
        let names = set_choices(choices, value)
            .map(|x| Value::String(x.name().to_owned()))
            .collect();
        self.insert(field.name(), Value::Array(names));
        Ok(())
    }

    fn on_begin_composite(&mut self, field: &'a Token, _type_token: &'a Token) -> Result<(), Error> {
        self.stack
            .push(Frame::Object(Some(field.name().to_owned()), Map::new()));
        Ok(())
    }

    fn on_end_composite(&mut self, _field: &'a Token, _type_token: &'a Token) -> Result<(), Error> {
        self.pop_into_parent();
        Ok(())
    }

    fn on_group_header(&mut self, token: &'a Token, num_in_group: u64, _block_length: u64) -> Result<(), Error> {
        let capacity = usize::try_from(num_in_group).unwrap_or(0).min(1024);
        self.stack
            .push(Frame::Group(token.name().to_owned(), Vec::with_capacity(capacity)));
        Ok(())
    }

    fn on_begin_group(&mut self, _token: &'a Token, _index: u64, _num_in_group: u64) -> Result<(), Error> {
        self.stack.push(Frame::Object(None, Map::new()));
        Ok(())
    }

    fn on_end_group(&mut self, _token: &'a Token, _index: u64, _num_in_group: u64) -> Result<(), Error> {
        self.pop_into_parent();
        Ok(())
    }

    fn on_group_end(&mut self, _token: &'a Token, _num_in_group: u64) -> Result<(), Error> {
        self.pop_into_parent();
        Ok(())
    }

    fn on_var_data(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        data: &'a [u8],
        _offset: usize,
    ) -> Result<(), Error> {
        let encoding = character_encoding(type_token);
        let is_char = type_token.encoding().primitive_type() == Some(PrimitiveType::Char);
        let value = match encoding {
            Some(encoding) => Value::String(encoding.decode(data).into_owned()),
            None if is_char || self.options.lossy_data => {
                Value::String(String::from_utf8_lossy(data).into_owned())
            }
            None => Value::Array(data.iter().map(|&x| Value::from(x)).collect()),
        };
        self.insert(field.name(), value);
        Ok(())
    }
}

/// Decodes messages and prints them as JSON
#[derive(Debug, Clone)]
pub struct JsonPrinter<'ir> {
    ir: &'ir Ir,
    options: JsonOptions,
}

impl<'ir> JsonPrinter<'ir> {
    pub fn new(ir: &'ir Ir) -> Self {
        JsonPrinter {
            ir,
            options: JsonOptions::default(),
        }
    }

    pub fn with_options(mut self, options: JsonOptions) -> Self {
        self.options = options;
        self
    }

    /// Decode the message at `offset` into a JSON value
    pub fn to_value(&self, data: &[u8], offset: usize) -> Result<Value, Error> {
        let decoder = OtfDecoder::new(self.ir)?;
        let mut listener = JsonListener::with_options(self.options);
        decoder.decode(data, offset, &mut listener)?;
        Ok(listener.into_value().unwrap_or(Value::Null))
    }

    /// Decode the message at `offset` and return it as a JSON string
    pub fn print(&self, data: &[u8], offset: usize) -> Result<String, Error> {
        let value = self.to_value(data, offset)?;
        let result = if self.options.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(result)
    }

    /// Decode every back to back message in `data` and write each as a line
    /// of JSON (or a pretty printed document when so configured)
    pub fn print_stream<W: Write>(&self, data: &[u8], mut writer: W) -> Result<usize, Error> {
        let decoder = OtfDecoder::new(self.ir)?;
        let mut listener = JsonListener::with_options(self.options);
        let count = decoder.decode_stream(data, &mut listener)?;
        for message in listener.into_messages() {
            if self.options.pretty {
                serde_json::to_writer_pretty(&mut writer, &message)?;
            } else {
                serde_json::to_writer(&mut writer, &message)?;
            }
            writer.write_all(b"\n")?;
        }
        Ok(count)
    }
}

/// Decode the message at the start of `data` into any deserializable type
///
/// ```
/// use serde::Deserialize;
/// use sbe_otf::ir::builder::{EncodedType, Field, IrBuilder, Message};
/// use sbe_otf::PrimitiveType;
///
/// #[derive(Deserialize, Debug, PartialEq)]
/// struct Tick {
///     px: u16,
/// }
///
/// # fn main() -> Result<(), sbe_otf::Error> {
/// let ir = IrBuilder::new("example", 1, 0)
///     .message(Message::new("Tick", 3).field(Field::new("px", 1, EncodedType::new("px", PrimitiveType::UInt16))))
///     .build()?;
///
/// let tick: Tick = sbe_otf::json::from_slice(&ir, &[2, 0, 3, 0, 1, 0, 0, 0, 0x10, 0x00])?;
/// assert_eq!(tick, Tick { px: 16 });
/// # Ok(())
/// # }
/// ```
pub fn from_slice<T>(ir: &Ir, data: &[u8]) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let value = JsonPrinter::new(ir).to_value(data, 0)?;
    Ok(serde_json::from_value(value)?)
}
