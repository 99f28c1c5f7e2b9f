use crate::{ByteOrder, CharacterEncoding, Encoding, PrimitiveType, PrimitiveValue};
use std::borrow::Cow;
use std::fmt;

/// Zero-copy view of an encoded field: the exact bytes of one primitive or
/// fixed length array of primitives, along with how to interpret them.
///
/// The bytes are borrowed either from the message buffer or, for constant
/// encodings, from the IR.
///
/// ```
/// use sbe_otf::{ByteOrder, FieldValue, PrimitiveType, PrimitiveValue};
///
/// let data = [0x01, 0x00, 0x02, 0x00];
/// let value = FieldValue::new(&data, PrimitiveType::UInt16, ByteOrder::LittleEndian);
/// assert_eq!(value.len(), 2);
/// assert_eq!(value.get(1), Some(PrimitiveValue::UInt(2)));
/// assert_eq!(value.iter().count(), 2);
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct FieldValue<'a> {
    data: &'a [u8],
    primitive_type: PrimitiveType,
    byte_order: ByteOrder,
}

impl<'a> FieldValue<'a> {
    pub fn new(data: &'a [u8], primitive_type: PrimitiveType, byte_order: ByteOrder) -> Self {
        FieldValue {
            data,
            primitive_type,
            byte_order,
        }
    }

    /// View the underlying encoded bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Number of primitive elements
    pub fn len(&self) -> usize {
        self.data.len() / self.primitive_type.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the element at `index`
    pub fn get(&self, index: usize) -> Option<PrimitiveValue> {
        let size = self.primitive_type.size();
        let start = index.checked_mul(size)?;
        let data = self.data.get(start..start.checked_add(size)?)?;
        self.primitive_type.read(data, self.byte_order)
    }

    /// Decode the first element, which for non-array encodings is the value
    pub fn scalar(&self) -> Option<PrimitiveValue> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = PrimitiveValue> + 'a {
        let ty = self.primitive_type;
        let order = self.byte_order;
        self.data
            .chunks_exact(ty.size())
            .filter_map(move |x| ty.read(x, order))
    }

    /// Whether a single element value equals the encoding's null value
    pub fn is_null(&self, encoding: &Encoding) -> bool {
        if self.len() != 1 {
            return false;
        }

        match (self.scalar(), encoding.applicable_null_value()) {
            (Some(value), Some(null)) => value.same_as(&null),
            _ => false,
        }
    }

    /// Whether this is a `char` encoding, which listeners typically render
    /// as text
    pub fn is_char(&self) -> bool {
        self.primitive_type == PrimitiveType::Char
    }

    /// Interpret a `char` array as text. Trailing nul padding is removed.
    ///
    /// ```
    /// use sbe_otf::{ByteOrder, CharacterEncoding, FieldValue, PrimitiveType};
    ///
    /// let value = FieldValue::new(b"MSFT\0\0\0\0", PrimitiveType::Char, ByteOrder::LittleEndian);
    /// assert_eq!(value.to_text(CharacterEncoding::Ascii), "MSFT");
    /// ```
    pub fn to_text(&self, encoding: CharacterEncoding) -> Cow<'a, str> {
        let end = self
            .data
            .iter()
            .position(|&x| x == 0)
            .unwrap_or(self.data.len());
        encoding.decode(&self.data[..end])
    }
}

impl<'a> fmt::Debug for FieldValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValue")
            .field("type", &self.primitive_type)
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> fmt::Display for FieldValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_char() {
            return write!(f, "{}", self.to_text(CharacterEncoding::Latin1));
        }

        for (i, value) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_array() {
        let data = [1u8, 2, 3];
        let value = FieldValue::new(&data, PrimitiveType::Int8, ByteOrder::LittleEndian);
        assert_eq!(value.to_string(), "1,2,3");
    }

    #[test]
    fn test_display_chars() {
        let value = FieldValue::new(b"AB\0\0", PrimitiveType::Char, ByteOrder::LittleEndian);
        assert_eq!(value.to_string(), "AB");
    }

    #[test]
    fn test_get_out_of_range() {
        let data = [1u8, 0, 2];
        let value = FieldValue::new(&data, PrimitiveType::UInt16, ByteOrder::LittleEndian);
        assert_eq!(value.len(), 1);
        assert_eq!(value.get(1), None);
        assert_eq!(value.get(usize::MAX), None);
    }

    #[test]
    fn test_is_null() {
        let encoding = Encoding::new(PrimitiveType::UInt8, ByteOrder::LittleEndian);
        let data = [0xff];
        let value = FieldValue::new(&data, PrimitiveType::UInt8, ByteOrder::LittleEndian);
        assert!(value.is_null(&encoding));

        let data = [0x01];
        let value = FieldValue::new(&data, PrimitiveType::UInt8, ByteOrder::LittleEndian);
        assert!(!value.is_null(&encoding));
    }
}
