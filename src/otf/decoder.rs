use super::{HeaderDecoder, MessageHeader, TokenListener};
use crate::{
    errors::ErrorKind,
    ir::{navigate, Ir, Signal, Token},
    util::remaining,
    Error, FieldValue,
};
use log::{debug, trace};

/// How deeply composites and groups may nest before a decode is abandoned
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Decode the body of one message, reporting every present element to the
/// listener in schema order.
///
/// `tokens` is the message's token sequence as stored in the IR. When it is
/// bracketed by `BEGIN_MESSAGE`/`END_MESSAGE` the brackets are reported too.
/// `offset` is where the root block starts and `block_length` is the root
/// block length from the message header. Elements whose version is newer
/// than `acting_version` are skipped without consuming bytes.
///
/// Returns the number of bytes consumed from `offset`: the root block plus
/// every group and variable length data section that follows it.
///
/// ```
/// use sbe_otf::ir::builder::{EncodedType, Field, IrBuilder, Message};
/// use sbe_otf::{otf::decode_message, FieldValue, Error, PrimitiveType, Token, TokenListener};
///
/// struct Sum(u64);
///
/// impl<'a> TokenListener<'a> for Sum {
///     fn on_encoding(&mut self, _: &'a Token, _: &'a Token, value: FieldValue<'a>, _: usize) -> Result<(), Error> {
///         self.0 += value.scalar().and_then(|x| x.as_u64()).unwrap_or(0);
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), Error> {
/// let ir = IrBuilder::new("example", 1, 0)
///     .message(
///         Message::new("Pair", 1)
///             .field(Field::new("a", 1, EncodedType::new("a", PrimitiveType::UInt8)))
///             .field(Field::new("b", 2, EncodedType::new("b", PrimitiveType::UInt8))),
///     )
///     .build()?;
///
/// let mut sum = Sum(0);
/// let read = decode_message(&[2, 3], 0, 0, 2, ir.message(1).unwrap(), &mut sum)?;
/// assert_eq!(read, 2);
/// assert_eq!(sum.0, 5);
/// # Ok(())
/// # }
/// ```
pub fn decode_message<'a, L>(
    buffer: &'a [u8],
    offset: usize,
    acting_version: u32,
    block_length: usize,
    tokens: &'a [Token],
    listener: &mut L,
) -> Result<usize, Error>
where
    L: TokenListener<'a> + ?Sized,
{
    let mut walker = Walker {
        buffer,
        acting_version,
        max_depth: DEFAULT_MAX_DEPTH,
        listener,
    };
    walker.message(tokens, offset, block_length)
}

struct Walker<'a, 'l, L: ?Sized> {
    buffer: &'a [u8],
    acting_version: u32,
    max_depth: usize,
    listener: &'l mut L,
}

impl<'a, 'l, L> Walker<'a, 'l, L>
where
    L: TokenListener<'a> + ?Sized,
{
    fn message(&mut self, tokens: &'a [Token], offset: usize, block_length: usize) -> Result<usize, Error> {
        let bracketed = tokens.first().map(|x| x.signal()) == Some(Signal::BeginMessage);
        let (message, body) = if bracketed {
            let message = subtree(tokens, 0)?;
            (Some(message), &message[1..message.len() - 1])
        } else {
            (None, tokens)
        };

        let available = remaining(self.buffer, offset);
        if block_length > available {
            let name = message.and_then(|x| x.first()).map_or("message", |x| x.name());
            return Err(Error::new(ErrorKind::LengthOverflow {
                token: name.to_owned(),
                offset,
                declared: block_length as u64,
                available,
            }));
        }

        if let Some(first) = message.and_then(|x| x.first()) {
            self.listener.on_begin_message(first)?;
        }

        let end = self.block(body, offset, block_length, 0)?;

        if let Some(last) = message.and_then(|x| x.last()) {
            self.listener.on_end_message(last)?;
        }

        Ok(end - offset)
    }

    /// Decode fields, then groups, then var data. Returns the buffer position
    /// just past everything the block owns.
    fn block(
        &mut self,
        tokens: &'a [Token],
        block_start: usize,
        block_length: usize,
        depth: usize,
    ) -> Result<usize, Error> {
        let i = self.fields(tokens, 0, block_start, depth)?;
        let position = checked_position(block_start, block_length, tokens.first())?;
        let (i, position) = self.groups(tokens, i, position, depth)?;
        let (i, position) = self.var_data(tokens, i, position)?;

        if let Some(token) = tokens.get(i) {
            return Err(Error::invalid_ir(format!(
                "unexpected {} {} at index {} of block",
                token.signal(),
                token.name(),
                i
            )));
        }

        Ok(position)
    }

    fn fields(
        &mut self,
        tokens: &'a [Token],
        mut i: usize,
        block_start: usize,
        depth: usize,
    ) -> Result<usize, Error> {
        let mut running = 0;
        while let Some(field) = tokens.get(i).filter(|x| x.signal() == Signal::BeginField) {
            let field_tokens = subtree(tokens, i)?;
            i += field_tokens.len();
            if !field.is_present(self.acting_version) {
                continue;
            }

            let offset = field.offset().unwrap_or(running);
            running = checked_position(offset, field.encoded_length(), Some(field))?;
            let position = checked_position(block_start, offset, Some(field))?;

            let type_tokens = &field_tokens[1..field_tokens.len() - 1];
            if type_tokens.is_empty() {
                return Err(Error::invalid_ir(format!("field {} has no type", field.name())));
            }

            self.typed(field, subtree(type_tokens, 0)?, position, depth)?;
        }

        Ok(i)
    }

    /// Decode one type construct, whose tokens begin with an `ENCODING`,
    /// `BEGIN_ENUM`, `BEGIN_SET`, or `BEGIN_COMPOSITE`
    fn typed(
        &mut self,
        field: &'a Token,
        tokens: &'a [Token],
        position: usize,
        depth: usize,
    ) -> Result<(), Error> {
        let type_token = &tokens[0];
        match type_token.signal() {
            Signal::Encoding => self.encoding(field, type_token, position),
            Signal::BeginEnum => self.enumeration(field, tokens, position),
            Signal::BeginSet => self.bit_set(field, tokens, position),
            Signal::BeginComposite => self.composite(field, tokens, position, depth),
            signal => Err(Error::invalid_ir(format!(
                "{} {} can't describe the type of {}",
                signal,
                type_token.name(),
                field.name()
            ))),
        }
    }

    fn encoding(&mut self, field: &'a Token, token: &'a Token, position: usize) -> Result<(), Error> {
        let value = self.value(token, position)?;
        self.listener.on_encoding(field, token, value, position)
    }

    fn enumeration(&mut self, field: &'a Token, tokens: &'a [Token], position: usize) -> Result<(), Error> {
        let begin = &tokens[0];
        let value = self.value(begin, position)?.scalar().ok_or_else(|| {
            Error::invalid_ir(format!("enum {} has no encoded value", begin.name()))
        })?;

        let valid_value = tokens[1..tokens.len() - 1].iter().find(|x| {
            x.signal() == Signal::ValidValue
                && x.encoding()
                    .const_value()
                    .and_then(|c| c.scalar())
                    .is_some_and(|c| c.same_as(&value))
        });

        self.listener
            .on_enum(field, begin, value, valid_value, position)
    }

    fn bit_set(&mut self, field: &'a Token, tokens: &'a [Token], position: usize) -> Result<(), Error> {
        let begin = &tokens[0];
        let value = self
            .value(begin, position)?
            .scalar()
            .and_then(|x| x.as_u64())
            .ok_or_else(|| {
                Error::invalid_ir(format!("set {} must be an unsigned encoding", begin.name()))
            })?;

        let choices = &tokens[1..tokens.len() - 1];
        self.listener
            .on_bit_set(field, begin, value, choices, position)
    }

    fn composite(
        &mut self,
        field: &'a Token,
        tokens: &'a [Token],
        position: usize,
        depth: usize,
    ) -> Result<(), Error> {
        let depth = self.descend(depth)?;
        let begin = &tokens[0];
        self.listener.on_begin_composite(field, begin)?;

        let members = &tokens[1..tokens.len() - 1];
        let mut i = 0;
        let mut running = 0;
        while i < members.len() {
            let member_tokens = subtree(members, i)?;
            let member = &member_tokens[0];
            i += member_tokens.len();
            if !member.is_present(self.acting_version) {
                continue;
            }

            let offset = member.offset().unwrap_or(running);
            running = checked_position(offset, member.encoded_length(), Some(member))?;
            let member_position = checked_position(position, offset, Some(member))?;
            self.typed(member, member_tokens, member_position, depth)?;
        }

        self.listener.on_end_composite(field, &tokens[tokens.len() - 1])
    }

    fn groups(
        &mut self,
        tokens: &'a [Token],
        mut i: usize,
        mut position: usize,
        depth: usize,
    ) -> Result<(usize, usize), Error> {
        while let Some(group) = tokens.get(i).filter(|x| x.signal() == Signal::BeginGroup) {
            let group_tokens = subtree(tokens, i)?;
            i += group_tokens.len();
            if !group.is_present(self.acting_version) {
                trace!("skipping group {} absent in version {}", group.name(), self.acting_version);
                continue;
            }

            let depth = self.descend(depth)?;
            let inner = &group_tokens[1..group_tokens.len() - 1];
            let dimension = match inner.first() {
                Some(x) if x.signal() == Signal::BeginComposite => subtree(inner, 0)?,
                _ => {
                    return Err(Error::invalid_ir(format!(
                        "group {} lacks a dimension composite",
                        group.name()
                    )))
                }
            };

            let header_length = dimension[0].encoded_length();
            let available = remaining(self.buffer, position);
            if available < header_length {
                return Err(Error::new(ErrorKind::BufferUnderflow {
                    token: group.name().to_owned(),
                    offset: position,
                    needed: header_length,
                    available,
                }));
            }

            let block_length = self.dimension_value(group, dimension, "blockLength", position)?;
            let num_in_group = self.dimension_value(group, dimension, "numInGroup", position)?;
            position += header_length;

            let body = &inner[dimension.len()..];
            let footprint = self.element_footprint(body, block_length)?;
            let available = remaining(self.buffer, position);
            let declared = footprint.checked_mul(num_in_group);
            let block_length = match (declared, usize::try_from(block_length)) {
                (Some(total), Ok(block_length)) if total <= available as u64 => block_length,
                _ => {
                    return Err(Error::new(ErrorKind::LengthOverflow {
                        token: group.name().to_owned(),
                        offset: position,
                        declared: declared.unwrap_or(u64::MAX),
                        available,
                    }))
                }
            };

            trace!(
                "group {} at {}: {} elements of {} bytes",
                group.name(),
                position,
                num_in_group,
                block_length
            );

            self.listener
                .on_group_header(group, num_in_group, block_length as u64)?;
            for index in 0..num_in_group {
                self.listener.on_begin_group(group, index, num_in_group)?;
                position = self.block(body, position, block_length, depth)?;
                self.listener.on_end_group(group, index, num_in_group)?;
            }
            self.listener.on_group_end(group, num_in_group)?;
        }

        Ok((i, position))
    }

    fn var_data(
        &mut self,
        tokens: &'a [Token],
        mut i: usize,
        mut position: usize,
    ) -> Result<(usize, usize), Error> {
        while let Some(data) = tokens.get(i).filter(|x| x.signal() == Signal::BeginVarData) {
            let data_tokens = subtree(tokens, i)?;
            i += data_tokens.len();
            if !data.is_present(self.acting_version) {
                trace!("skipping var data {} absent in version {}", data.name(), self.acting_version);
                continue;
            }

            let length_token = member(data_tokens, data, "length")?;
            let payload_token = member(data_tokens, data, "varData")?;
            let length_offset = length_token.offset().unwrap_or(0);
            let payload_offset = match payload_token.offset() {
                Some(x) => x,
                None => checked_position(length_offset, length_token.encoded_length(), Some(length_token))?,
            };

            let length_position = checked_position(position, length_offset, Some(length_token))?;
            let length = self.unsigned(length_token, length_position)?;
            let payload_position = checked_position(position, payload_offset, Some(payload_token))?;

            let available = remaining(self.buffer, payload_position);
            let length = match usize::try_from(length) {
                Ok(x) if x <= available => x,
                _ => {
                    return Err(Error::new(ErrorKind::LengthOverflow {
                        token: data.name().to_owned(),
                        offset: payload_position,
                        declared: length,
                        available,
                    }))
                }
            };

            trace!("var data {} at {}: {} bytes", data.name(), payload_position, length);

            let end = payload_position + length;
            let payload = &self.buffer[payload_position..end];
            self.listener
                .on_var_data(data, payload_token, payload, payload_position)?;
            position = end;
        }

        Ok((i, position))
    }

    /// The fewest bytes a group element occupies: its block plus the length
    /// headers of the nested groups and var data present in it. Never less
    /// than one, so an element count can't exceed the bytes left.
    fn element_footprint(&self, body: &'a [Token], block_length: u64) -> Result<u64, Error> {
        let mut footprint = block_length;
        let mut i = 0;
        while let Some(token) = body.get(i) {
            let tokens = subtree(body, i)?;
            i += tokens.len();
            if !token.is_present(self.acting_version) {
                continue;
            }

            let header = match token.signal() {
                Signal::BeginGroup => tokens.get(1).map_or(0, |x| x.encoded_length()),
                Signal::BeginVarData => {
                    let length = member(tokens, token, "length")?;
                    length
                        .offset()
                        .unwrap_or(0)
                        .saturating_add(length.encoded_length())
                }
                _ => 0,
            };
            footprint = footprint.saturating_add(header as u64);
        }

        Ok(footprint.max(1))
    }

    fn descend(&self, depth: usize) -> Result<usize, Error> {
        if depth >= self.max_depth {
            Err(Error::new(ErrorKind::DepthExceeded {
                max: self.max_depth,
            }))
        } else {
            Ok(depth + 1)
        }
    }

    fn dimension_value(
        &self,
        group: &Token,
        dimension: &'a [Token],
        name: &str,
        position: usize,
    ) -> Result<u64, Error> {
        let token = member(dimension, group, name)?;
        let position = checked_position(position, token.offset().unwrap_or(0), Some(token))?;
        self.unsigned(token, position)
    }

    /// The bytes of an encoding at `position`, or its schema value when it
    /// is a constant
    fn value(&self, token: &'a Token, position: usize) -> Result<FieldValue<'a>, Error> {
        let encoding = token.encoding();
        let primitive_type = encoding.primitive_type().ok_or_else(|| {
            Error::invalid_ir(format!("{} {} has no primitive type", token.signal(), token.name()))
        })?;

        if token.is_constant_encoding() {
            return encoding.const_value().ok_or_else(|| {
                Error::invalid_ir(format!("constant {} has no value", token.name()))
            });
        }

        let needed = token.encoded_length();
        let data = position
            .checked_add(needed)
            .and_then(|end| self.buffer.get(position..end))
            .ok_or_else(|| {
                Error::new(ErrorKind::BufferUnderflow {
                    token: token.name().to_owned(),
                    offset: position,
                    needed,
                    available: remaining(self.buffer, position),
                })
            })?;

        Ok(FieldValue::new(data, primitive_type, encoding.byte_order()))
    }

    fn unsigned(&self, token: &'a Token, position: usize) -> Result<u64, Error> {
        let value = self.value(token, position)?;
        let scalar = value.scalar().ok_or_else(|| {
            let size = value.primitive_type().size();
            Error::new(ErrorKind::BufferUnderflow {
                token: token.name().to_owned(),
                offset: position,
                needed: size,
                available: value.as_bytes().len(),
            })
        })?;

        // A negative length can't be satisfied by any buffer
        Ok(scalar.as_u64().unwrap_or(u64::MAX))
    }
}

fn subtree(tokens: &[Token], index: usize) -> Result<&[Token], Error> {
    navigate::find_end(tokens, index)
        .filter(|&end| end > index || !tokens[index].signal().is_begin())
        .map(|end| &tokens[index..=end])
        .ok_or_else(|| {
            let name = tokens.get(index).map_or("", |x| x.name());
            Error::invalid_ir(format!(
                "token {} at index {} does not close within its sequence",
                name, index
            ))
        })
}

fn member<'t>(tokens: &'t [Token], owner: &Token, name: &str) -> Result<&'t Token, Error> {
    tokens
        .iter()
        .find(|x| x.signal() == Signal::Encoding && x.name() == name)
        .ok_or_else(|| {
            Error::invalid_ir(format!(
                "{} {} lacks a member named {}",
                owner.signal(),
                owner.name(),
                name
            ))
        })
}

fn checked_position(base: usize, delta: usize, token: Option<&Token>) -> Result<usize, Error> {
    base.checked_add(delta).ok_or_else(|| {
        Error::new(ErrorKind::LengthOverflow {
            token: token.map_or_else(String::new, |x| x.name().to_owned()),
            offset: base,
            declared: delta as u64,
            available: 0,
        })
    })
}

/// Decodes whole messages, header included, against an IR
///
/// The decoder borrows the IR and holds no per-message state, so one
/// instance may be shared between threads.
///
/// ```
/// use sbe_otf::ir::builder::{EncodedType, Field, IrBuilder, Message};
/// use sbe_otf::{OtfDecoder, PrimitiveType, TokenListener};
///
/// struct Ignore;
/// impl<'a> TokenListener<'a> for Ignore {}
///
/// # fn main() -> Result<(), sbe_otf::Error> {
/// let ir = IrBuilder::new("example", 9, 0)
///     .message(
///         Message::new("Tick", 4)
///             .field(Field::new("px", 1, EncodedType::new("px", PrimitiveType::UInt16))),
///     )
///     .build()?;
///
/// let decoder = OtfDecoder::builder().max_depth(4).build(&ir)?;
/// let data = [2, 0, 4, 0, 9, 0, 0, 0, 0x34, 0x12];
/// assert_eq!(decoder.decode(&data, 0, &mut Ignore)?, data.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OtfDecoder<'ir> {
    ir: &'ir Ir,
    header: HeaderDecoder,
    max_depth: usize,
    acting_version: Option<u32>,
}

impl<'ir> OtfDecoder<'ir> {
    /// Create a decoder with the default options
    pub fn new(ir: &'ir Ir) -> Result<Self, Error> {
        OtfDecoder::builder().build(ir)
    }

    /// Initializes a default [OtfDecoderBuilder]
    pub fn builder() -> OtfDecoderBuilder {
        OtfDecoderBuilder::default()
    }

    /// The IR messages are decoded against
    pub fn ir(&self) -> &'ir Ir {
        self.ir
    }

    /// The decoder for the IR's message header
    pub fn header_decoder(&self) -> &HeaderDecoder {
        &self.header
    }

    /// Read and validate the header of the message at `offset`
    pub fn decode_header(&self, buffer: &[u8], offset: usize) -> Result<MessageHeader, Error> {
        self.header.decode(buffer, offset)
    }

    /// Decode the message at `offset`. Returns the number of bytes the
    /// message occupies, header included.
    pub fn decode<'a, L>(&self, buffer: &'a [u8], offset: usize, listener: &mut L) -> Result<usize, Error>
    where
        L: TokenListener<'a> + ?Sized,
        'ir: 'a,
    {
        let header = self.header.decode(buffer, offset)?;
        let ir: &'ir Ir = self.ir;
        let tokens = ir
            .message(header.template_id)
            .ok_or_else(|| {
                Error::new(ErrorKind::UnknownTemplate {
                    template_id: header.template_id,
                })
            })?;

        let acting_version = self
            .acting_version
            .unwrap_or_else(|| u32::try_from(header.version).unwrap_or(u32::MAX));

        let body = offset + header.encoded_length;
        let block_length = usize::try_from(header.block_length).map_err(|_| {
            Error::new(ErrorKind::LengthOverflow {
                token: String::from("blockLength"),
                offset: body,
                declared: header.block_length,
                available: remaining(buffer, body),
            })
        })?;

        debug!(
            "decoding template {} at {} with acting version {}",
            header.template_id, offset, acting_version
        );

        let mut walker = Walker {
            buffer,
            acting_version,
            max_depth: self.max_depth,
            listener,
        };

        let read = walker.message(tokens, body, block_length)?;
        Ok(header.encoded_length + read)
    }

    /// Decode back to back messages until the buffer is exhausted. Returns
    /// the number of messages decoded.
    pub fn decode_stream<'a, L>(&self, buffer: &'a [u8], listener: &mut L) -> Result<usize, Error>
    where
        L: TokenListener<'a> + ?Sized,
        'ir: 'a,
    {
        let mut offset = 0;
        let mut count = 0;
        while offset < buffer.len() {
            offset += self.decode(buffer, offset, listener)?;
            count += 1;
        }

        Ok(count)
    }
}

/// Configures an [OtfDecoder]
#[derive(Debug, Clone, Default)]
pub struct OtfDecoderBuilder {
    max_depth: Option<usize>,
    acting_version: Option<u32>,
}

impl OtfDecoderBuilder {
    /// Limit how deeply composites and groups may nest. Defaults to
    /// [DEFAULT_MAX_DEPTH].
    pub fn max_depth(mut self, depth: usize) -> OtfDecoderBuilder {
        self.max_depth = Some(depth);
        self
    }

    /// Decode every message as if it were encoded at `version` instead of
    /// the version its header declares
    pub fn acting_version(mut self, version: u32) -> OtfDecoderBuilder {
        self.acting_version = Some(version);
        self
    }

    pub fn build(self, ir: &Ir) -> Result<OtfDecoder<'_>, Error> {
        Ok(OtfDecoder {
            ir,
            header: HeaderDecoder::from_ir(ir)?,
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            acting_version: self.acting_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::{CompositeType, EncodedType, EnumType, Field, IrBuilder, Message, SetType};
    use crate::{PrimitiveType, PrimitiveValue};

    #[derive(Debug, Default)]
    struct Recorder(Vec<String>);

    impl<'a> TokenListener<'a> for Recorder {
        fn on_begin_message(&mut self, token: &'a Token) -> Result<(), Error> {
            self.0.push(format!("begin {}", token.name()));
            Ok(())
        }

        fn on_end_message(&mut self, token: &'a Token) -> Result<(), Error> {
            self.0.push(format!("end {}", token.name()));
            Ok(())
        }

        fn on_encoding(
            &mut self,
            field: &'a Token,
            _type_token: &'a Token,
            value: FieldValue<'a>,
            offset: usize,
        ) -> Result<(), Error> {
            self.0.push(format!("{}={}@{}", field.name(), value, offset));
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
            let name = valid_value.map_or_else(|| value.to_string(), |x| x.name().to_owned());
            self.0.push(format!("{}={}", field.name(), name));
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
            let names: Vec<_> = crate::otf::set_choices(choices, value).map(|x| x.name()).collect();
            self.0.push(format!("{}={}", field.name(), names.join("|")));
            Ok(())
        }

        fn on_begin_composite(&mut self, field: &'a Token, _type_token: &'a Token) -> Result<(), Error> {
            self.0.push(format!("{{ {}", field.name()));
            Ok(())
        }

        fn on_end_composite(&mut self, field: &'a Token, _type_token: &'a Token) -> Result<(), Error> {
            self.0.push(format!("}} {}", field.name()));
            Ok(())
        }

        fn on_group_header(&mut self, token: &'a Token, num_in_group: u64, _block_length: u64) -> Result<(), Error> {
            self.0.push(format!("{}[{}]", token.name(), num_in_group));
            Ok(())
        }

        fn on_var_data(
            &mut self,
            field: &'a Token,
            _type_token: &'a Token,
            data: &'a [u8],
            offset: usize,
        ) -> Result<(), Error> {
            self.0.push(format!("{}={:?}@{}", field.name(), data, offset));
            Ok(())
        }
    }

    fn ir() -> Ir {
        let side = EnumType::new("Side", PrimitiveType::UInt8)
            .value("Buy", PrimitiveValue::UInt(1))
            .value("Sell", PrimitiveValue::UInt(2));
        let flags = SetType::new("Flags", PrimitiveType::UInt8)
            .choice("A", 0)
            .choice("B", 1)
            .choice("C", 2);
        let money = CompositeType::new("Money")
            .member(EncodedType::new("mantissa", PrimitiveType::Int32))
            .member(EncodedType::new("exponent", PrimitiveType::Int8).constant(PrimitiveValue::Int(-2)));

        IrBuilder::new("test", 1, 0)
            .message(
                Message::new("Everything", 2)
                    .field(Field::new("side", 1, side))
                    .field(Field::new("flags", 2, flags))
                    .field(Field::new("px", 3, money))
                    .field(Field::data("note", 4)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_every_type_kind() {
        let ir = ir();
        let data = [
            2, 0b101, 0x10, 0x27, 0, 0, // block
            2, 0, 0, 0, b'h', b'i', // var data
        ];
        let mut recorder = Recorder::default();
        let read = decode_message(&data, 0, 0, 6, ir.message(2).unwrap(), &mut recorder).unwrap();
        assert_eq!(read, data.len());
        assert_eq!(
            recorder.0,
            vec![
                "begin Everything",
                "side=Sell",
                "flags=A|C",
                "{ px",
                "mantissa=10000@2",
                "exponent=-2@6",
                "} px",
                "note=[104, 105]@10",
                "end Everything",
            ]
        );
    }

    #[test]
    fn test_unknown_enum_is_not_an_error() {
        let ir = ir();
        let data = [9, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut recorder = Recorder::default();
        decode_message(&data, 0, 0, 6, ir.message(2).unwrap(), &mut recorder).unwrap();
        assert_eq!(recorder.0[1], "side=9");
        assert_eq!(recorder.0[2], "flags=");
    }

    #[test]
    fn test_block_length_beyond_buffer() {
        let ir = ir();
        let mut recorder = Recorder::default();
        let err = decode_message(&[0; 4], 0, 0, 6, ir.message(2).unwrap(), &mut recorder).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LengthOverflow { declared: 6, available: 4, .. }));
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn test_var_data_length_beyond_buffer() {
        let ir = ir();
        let data = [1, 0, 0, 0, 0, 0, 200, 0, 0, 0, 1];
        let mut recorder = Recorder::default();
        let err = decode_message(&data, 0, 0, 6, ir.message(2).unwrap(), &mut recorder).unwrap_err();
        assert_eq!(err.offset(), Some(10));
        assert!(!recorder.0.iter().any(|x| x.starts_with("note")));
    }

    #[test]
    fn test_depth_limit() {
        let inner = CompositeType::new("Inner").member(EncodedType::new("x", PrimitiveType::UInt8));
        let outer = CompositeType::new("Outer").member(inner);
        let ir = IrBuilder::new("test", 1, 0)
            .message(Message::new("Deep", 1).field(Field::new("deep", 1, outer)))
            .build()
            .unwrap();

        let data = [1, 0, 1, 0, 1, 0, 0, 0, 1];
        let decoder = OtfDecoder::builder().max_depth(1).build(&ir).unwrap();
        let err = decoder.decode(&data[..], 0, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DepthExceeded { max: 1 }));

        let decoder = OtfDecoder::builder().max_depth(2).build(&ir).unwrap();
        assert_eq!(decoder.decode(&data[..], 0, &mut Recorder::default()).unwrap(), 9);
    }

    #[test]
    fn test_unknown_template() {
        let ir = ir();
        let decoder = OtfDecoder::new(&ir).unwrap();
        let data = [0, 0, 99, 0, 1, 0, 0, 0];
        let err = decoder.decode(&data[..], 0, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownTemplate { template_id: 99 }));
    }

    #[test]
    fn test_acting_version_override() {
        let ir = IrBuilder::new("test", 1, 1)
            .message(
                Message::new("V", 1)
                    .field(Field::new("a", 1, EncodedType::new("a", PrimitiveType::UInt8)))
                    .field(
                        Field::new("b", 2, EncodedType::new("b", PrimitiveType::UInt8))
                            .with_since_version(1),
                    ),
            )
            .build()
            .unwrap();

        let data = [2, 0, 1, 0, 1, 0, 1, 0, 5, 6];
        let decoder = OtfDecoder::builder().acting_version(0).build(&ir).unwrap();
        let mut recorder = Recorder::default();
        assert_eq!(decoder.decode(&data[..], 0, &mut recorder).unwrap(), 10);
        assert_eq!(recorder.0, vec!["begin V", "a=5@8", "end V"]);
    }

    #[test]
    fn test_malformed_tokens_are_errors() {
        let tokens = vec![
            Token::new(Signal::BeginMessage, "Bad").with_component_token_count(3),
            Token::new(Signal::BeginField, "x").with_component_token_count(40),
            Token::new(Signal::EndMessage, "Bad"),
        ];
        let err = decode_message(&[0; 4], 0, 0, 0, &tokens, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidIr(_)));
    }
}
