use super::{ByteOrder, PrimitiveType, PrimitiveValue, Signal};
use crate::FieldValue;

/// Whether a field must carry a value, may carry the null value, or is fixed
/// by the schema and absent from the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Presence {
    #[default]
    Required,
    Optional,
    Constant,
}

/// Encoding metadata attached to a token
///
/// Only `ENCODING`, `BEGIN_ENUM`, `VALID_VALUE`, `BEGIN_SET`, and `CHOICE`
/// tokens carry a primitive type. Constant values are stored pre-encoded in
/// the type's byte order so that they can be handed to listeners the same
/// way as bytes read from a buffer.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Encoding {
    presence: Presence,
    primitive_type: Option<PrimitiveType>,
    byte_order: ByteOrder,
    min_value: Option<PrimitiveValue>,
    max_value: Option<PrimitiveValue>,
    null_value: Option<PrimitiveValue>,
    const_value: Option<Vec<u8>>,
    character_encoding: Option<String>,
    epoch: Option<String>,
    time_unit: Option<String>,
    semantic_type: Option<String>,
}

impl Encoding {
    pub fn new(primitive_type: PrimitiveType, byte_order: ByteOrder) -> Self {
        Encoding {
            primitive_type: Some(primitive_type),
            byte_order,
            ..Encoding::default()
        }
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_min_value(mut self, value: PrimitiveValue) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn with_max_value(mut self, value: PrimitiveValue) -> Self {
        self.max_value = Some(value);
        self
    }

    pub fn with_null_value(mut self, value: PrimitiveValue) -> Self {
        self.null_value = Some(value);
        self
    }

    /// Set the constant value from bytes already encoded in this encoding's
    /// primitive type and byte order
    pub fn with_const_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.const_value = Some(bytes);
        self
    }

    /// Set the constant value by encoding a scalar. Has no effect when the
    /// encoding lacks a primitive type.
    pub fn with_const_value(self, value: PrimitiveValue) -> Self {
        match self.primitive_type {
            Some(ty) => {
                let mut bytes = Vec::with_capacity(ty.size());
                ty.write(value, self.byte_order, &mut bytes);
                self.with_const_bytes(bytes)
            }
            None => self,
        }
    }

    pub fn with_character_encoding<S: Into<String>>(mut self, encoding: S) -> Self {
        self.character_encoding = Some(encoding.into());
        self
    }

    pub fn with_epoch<S: Into<String>>(mut self, epoch: S) -> Self {
        self.epoch = Some(epoch.into());
        self
    }

    pub fn with_time_unit<S: Into<String>>(mut self, time_unit: S) -> Self {
        self.time_unit = Some(time_unit.into());
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        self.primitive_type
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// The declared minimum or the primitive type's default
    pub fn applicable_min_value(&self) -> Option<PrimitiveValue> {
        self.min_value
            .or_else(|| self.primitive_type.map(|x| x.min_value()))
    }

    /// The declared maximum or the primitive type's default
    pub fn applicable_max_value(&self) -> Option<PrimitiveValue> {
        self.max_value
            .or_else(|| self.primitive_type.map(|x| x.max_value()))
    }

    /// The declared null value or the primitive type's default
    pub fn applicable_null_value(&self) -> Option<PrimitiveValue> {
        self.null_value
            .or_else(|| self.primitive_type.map(|x| x.null_value()))
    }

    /// The constant value as a view, when this is a constant encoding
    pub fn const_value(&self) -> Option<FieldValue<'_>> {
        let ty = self.primitive_type?;
        let bytes = self.const_value.as_deref()?;
        Some(FieldValue::new(bytes, ty, self.byte_order))
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    pub fn epoch(&self) -> Option<&str> {
        self.epoch.as_deref()
    }

    pub fn time_unit(&self) -> Option<&str> {
        self.time_unit.as_deref()
    }

    pub fn semantic_type(&self) -> Option<&str> {
        self.semantic_type.as_deref()
    }
}

/// One node of the flattened schema tree
///
/// ```
/// use sbe_otf::{ByteOrder, Encoding, PrimitiveType, Signal, Token};
///
/// let token = Token::new(Signal::Encoding, "price")
///     .with_encoded_length(4)
///     .with_offset(0)
///     .with_encoding(Encoding::new(PrimitiveType::UInt32, ByteOrder::LittleEndian));
///
/// assert_eq!(token.array_length(), 1);
/// assert_eq!(token.component_token_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Token {
    signal: Signal,
    name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    referenced_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    id: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    version: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    deprecated: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    encoded_length: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    offset: Option<usize>,
    component_token_count: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    encoding: Encoding,
}

impl Token {
    pub fn new<S: Into<String>>(signal: Signal, name: S) -> Self {
        Token {
            signal,
            name: name.into(),
            referenced_name: None,
            description: None,
            id: None,
            version: 0,
            deprecated: None,
            encoded_length: 0,
            offset: None,
            component_token_count: 1,
            encoding: Encoding::default(),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the schema version in which the element first appeared
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_deprecated(mut self, deprecated: u32) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    pub fn with_encoded_length(mut self, length: usize) -> Self {
        self.encoded_length = length;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_component_token_count(mut self, count: usize) -> Self {
        self.component_token_count = count;
        self
    }

    pub(crate) fn set_component_token_count(&mut self, count: usize) {
        self.component_token_count = count;
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_referenced_name<S: Into<String>>(mut self, name: S) -> Self {
        self.referenced_name = Some(name.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn referenced_name(&self) -> Option<&str> {
        self.referenced_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Schema version in which this element first appeared
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn deprecated(&self) -> Option<u32> {
        self.deprecated
    }

    pub fn encoded_length(&self) -> usize {
        self.encoded_length
    }

    /// Static offset from the start of the enclosing block. `None` when the
    /// element directly follows its predecessor.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Number of tokens, including this one, that make up this construct
    pub fn component_token_count(&self) -> usize {
        self.component_token_count
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Whether an encoder at `acting_version` would have written this element
    #[inline]
    pub fn is_present(&self, acting_version: u32) -> bool {
        self.version <= acting_version
    }

    pub fn is_constant_encoding(&self) -> bool {
        self.encoding.presence() == Presence::Constant
    }

    pub fn is_optional_encoding(&self) -> bool {
        self.encoding.presence() == Presence::Optional
    }

    /// Number of primitive elements in the encoding, e.g. the width of a
    /// fixed length `char` array
    pub fn array_length(&self) -> usize {
        match self.encoding.primitive_type() {
            Some(ty) if self.encoded_length != 0 => self.encoded_length / ty.size(),
            _ => 1,
        }
    }
}
