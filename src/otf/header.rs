use crate::{
    errors::ErrorKind,
    ir::{ByteOrder, Ir, PrimitiveType, Signal, Token},
    util::remaining,
    Error,
};
use log::debug;

/// Routing metadata read from the front of an encoded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Length of the root block of the message body
    pub block_length: u64,

    /// Selects the message's token sequence within the IR
    pub template_id: u64,

    /// Identifies the schema the message was encoded with
    pub schema_id: u64,

    /// The schema version the encoder used, which becomes the acting version
    pub version: u64,

    /// Number of bytes the header occupies
    pub encoded_length: usize,
}

#[derive(Debug, Clone)]
struct HeaderMember {
    name: &'static str,
    offset: usize,
    primitive_type: PrimitiveType,
    byte_order: ByteOrder,
}

impl HeaderMember {
    fn locate(tokens: &[Token], name: &'static str) -> Result<HeaderMember, Error> {
        let mut running = 0;
        for token in tokens {
            if token.signal() != Signal::Encoding {
                continue;
            }

            let offset = token.offset().unwrap_or(running);
            running = offset.saturating_add(token.encoded_length());
            if token.name() != name {
                continue;
            }

            let encoding = token.encoding();
            return match encoding.primitive_type() {
                Some(primitive_type) if !primitive_type.is_float() => Ok(HeaderMember {
                    name,
                    offset,
                    primitive_type,
                    byte_order: encoding.byte_order(),
                }),
                _ => Err(Error::invalid_ir(format!(
                    "header member {} must be an integer",
                    name
                ))),
            };
        }

        Err(Error::new(ErrorKind::MissingHeaderField(name)))
    }

    fn read(&self, data: &[u8], start: usize) -> Result<u64, Error> {
        let offset = start.checked_add(self.offset).ok_or_else(|| {
            Error::new(ErrorKind::LengthOverflow {
                token: String::from(self.name),
                offset: start,
                declared: self.offset as u64,
                available: 0,
            })
        })?;

        let value = data
            .get(offset..)
            .and_then(|x| self.primitive_type.read(x, self.byte_order))
            .ok_or_else(|| {
                Error::new(ErrorKind::BufferUnderflow {
                    token: String::from(self.name),
                    offset,
                    needed: self.primitive_type.size(),
                    available: remaining(data, offset),
                })
            })?;

        // Negative header values can't address anything, so they saturate
        // and fail later as an overflow or unknown template
        Ok(value.as_u64().unwrap_or(u64::MAX))
    }
}

/// Decodes message headers laid out by the IR's header composite
///
/// ```
/// use sbe_otf::{ir::builder::IrBuilder, HeaderDecoder};
///
/// # fn main() -> Result<(), sbe_otf::Error> {
/// let ir = IrBuilder::new("example", 7, 2).build()?;
/// let decoder = HeaderDecoder::from_ir(&ir)?;
///
/// let data = [16, 0, 1, 0, 7, 0, 2, 0];
/// let header = decoder.decode(&data, 0)?;
/// assert_eq!(header.block_length, 16);
/// assert_eq!(header.template_id, 1);
/// assert_eq!(header.version, 2);
/// assert_eq!(header.encoded_length, 8);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HeaderDecoder {
    name: String,
    encoded_length: usize,
    expected_schema_id: Option<u64>,
    block_length: HeaderMember,
    template_id: HeaderMember,
    schema_id: HeaderMember,
    version: HeaderMember,
}

impl HeaderDecoder {
    /// Create a decoder from the tokens of a header composite. The members
    /// are found by name: `blockLength`, `templateId`, `schemaId`, and
    /// `version`.
    pub fn new(tokens: &[Token]) -> Result<Self, Error> {
        let block_length = HeaderMember::locate(tokens, "blockLength")?;
        let template_id = HeaderMember::locate(tokens, "templateId")?;
        let schema_id = HeaderMember::locate(tokens, "schemaId")?;
        let version = HeaderMember::locate(tokens, "version")?;

        let members_end = [&block_length, &template_id, &schema_id, &version]
            .iter()
            .map(|x| x.offset + x.primitive_type.size())
            .max()
            .unwrap_or_default();

        let first = tokens.first();
        let encoded_length = first
            .map(|x| x.encoded_length())
            .unwrap_or_default()
            .max(members_end);

        Ok(HeaderDecoder {
            name: first.map(|x| x.name().to_owned()).unwrap_or_default(),
            encoded_length,
            expected_schema_id: None,
            block_length,
            template_id,
            schema_id,
            version,
        })
    }

    /// Create a decoder for the IR's header that rejects messages encoded
    /// against another schema
    pub fn from_ir(ir: &Ir) -> Result<Self, Error> {
        let mut decoder = HeaderDecoder::new(ir.header_tokens())?;
        decoder.expected_schema_id = Some(ir.id());
        Ok(decoder)
    }

    /// Number of bytes a header occupies
    pub fn encoded_length(&self) -> usize {
        self.encoded_length
    }

    /// Read the header starting at `offset`
    pub fn decode(&self, buffer: &[u8], offset: usize) -> Result<MessageHeader, Error> {
        let available = remaining(buffer, offset);
        if available < self.encoded_length {
            return Err(Error::new(ErrorKind::BufferUnderflow {
                token: self.name.clone(),
                offset,
                needed: self.encoded_length,
                available,
            }));
        }

        let header = MessageHeader {
            block_length: self.block_length.read(buffer, offset)?,
            template_id: self.template_id.read(buffer, offset)?,
            schema_id: self.schema_id.read(buffer, offset)?,
            version: self.version.read(buffer, offset)?,
            encoded_length: self.encoded_length,
        };

        if let Some(expected) = self.expected_schema_id {
            if expected != header.schema_id {
                return Err(Error::new(ErrorKind::SchemaIdMismatch {
                    expected,
                    actual: header.schema_id,
                }));
            }
        }

        debug!(
            "decoded header at {}: template {} schema {} version {} block length {}",
            offset, header.template_id, header.schema_id, header.version, header.block_length
        );

        Ok(header)
    }

    /// Read only the template id
    pub fn template_id(&self, buffer: &[u8], offset: usize) -> Result<u64, Error> {
        self.template_id.read(buffer, offset)
    }

    /// Read only the schema version
    pub fn schema_version(&self, buffer: &[u8], offset: usize) -> Result<u64, Error> {
        self.version.read(buffer, offset)
    }

    /// Read only the root block length
    pub fn block_length(&self, buffer: &[u8], offset: usize) -> Result<u64, Error> {
        self.block_length.read(buffer, offset)
    }
}
