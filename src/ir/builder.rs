//! Schema model that compiles into IR tokens
//!
//! The structs here mirror the elements of a message schema (types, fields,
//! groups, variable length data, messages). [`IrBuilder::build`] lays them
//! out, computing field offsets and block lengths once, and flattens them
//! into the token sequences held by an [`Ir`].
//!
//! ```
//! use sbe_otf::ir::builder::{EncodedType, Field, IrBuilder, Message};
//! use sbe_otf::{PrimitiveType, Signal};
//!
//! # fn main() -> Result<(), sbe_otf::Error> {
//! let ir = IrBuilder::new("trading", 1, 0)
//!     .message(
//!         Message::new("Order", 1)
//!             .field(Field::new("price", 1, EncodedType::new("price", PrimitiveType::UInt32)))
//!             .field(Field::data("note", 2)),
//!     )
//!     .build()?;
//!
//! let tokens = ir.message(1).unwrap();
//! assert_eq!(tokens[0].signal(), Signal::BeginMessage);
//! assert_eq!(tokens[0].encoded_length(), 4);
//! assert_eq!(tokens[0].component_token_count(), tokens.len());
//! # Ok(())
//! # }
//! ```

use super::{ByteOrder, Encoding, Ir, Presence, PrimitiveType, PrimitiveValue, Signal, Token};
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
enum ConstValue {
    Scalar(PrimitiveValue),
    Bytes(Vec<u8>),
}

/// A primitive type, optionally a fixed length array of it
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedType {
    name: String,
    primitive_type: PrimitiveType,
    length: usize,
    presence: Presence,
    const_value: Option<ConstValue>,
    min_value: Option<PrimitiveValue>,
    max_value: Option<PrimitiveValue>,
    null_value: Option<PrimitiveValue>,
    character_encoding: Option<String>,
    semantic_type: Option<String>,
    offset: Option<usize>,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
}

impl EncodedType {
    pub fn new<S: Into<String>>(name: S, primitive_type: PrimitiveType) -> Self {
        EncodedType {
            name: name.into(),
            primitive_type,
            length: 1,
            presence: Presence::Required,
            const_value: None,
            min_value: None,
            max_value: None,
            null_value: None,
            character_encoding: None,
            semantic_type: None,
            offset: None,
            since_version: 0,
            deprecated: None,
            description: None,
        }
    }

    /// Number of elements. A length of zero marks the payload of variable
    /// length data.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn optional(self) -> Self {
        self.with_presence(Presence::Optional)
    }

    /// Fix the value in the schema. Constant types occupy no bytes.
    pub fn constant(mut self, value: PrimitiveValue) -> Self {
        self.presence = Presence::Constant;
        self.const_value = Some(ConstValue::Scalar(value));
        self
    }

    /// Fix a `char` array value in the schema
    pub fn constant_text(mut self, text: &str) -> Self {
        self.presence = Presence::Constant;
        self.length = text.len();
        self.const_value = Some(ConstValue::Bytes(text.as_bytes().to_vec()));
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

    pub fn with_character_encoding<S: Into<String>>(mut self, encoding: S) -> Self {
        self.character_encoding = Some(encoding.into());
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    /// Offset within an enclosing composite
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn encoded_length(&self) -> usize {
        if self.presence == Presence::Constant {
            0
        } else {
            self.primitive_type.size() * self.length
        }
    }
}

/// One literal of an enum
#[derive(Debug, Clone, PartialEq)]
pub struct ValidValue {
    name: String,
    value: PrimitiveValue,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
}

impl ValidValue {
    pub fn new<S: Into<String>>(name: S, value: PrimitiveValue) -> Self {
        ValidValue {
            name: name.into(),
            value,
            since_version: 0,
            deprecated: None,
            description: None,
        }
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A primitive whose values map to symbolic names
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    name: String,
    encoding_type: PrimitiveType,
    presence: Presence,
    null_value: Option<PrimitiveValue>,
    valid_values: Vec<ValidValue>,
    semantic_type: Option<String>,
    offset: Option<usize>,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
}

impl EnumType {
    pub fn new<S: Into<String>>(name: S, encoding_type: PrimitiveType) -> Self {
        EnumType {
            name: name.into(),
            encoding_type,
            presence: Presence::Required,
            null_value: None,
            valid_values: Vec::new(),
            semantic_type: None,
            offset: None,
            since_version: 0,
            deprecated: None,
            description: None,
        }
    }

    pub fn value<S: Into<String>>(self, name: S, value: PrimitiveValue) -> Self {
        self.with_valid_value(ValidValue::new(name, value))
    }

    pub fn with_valid_value(mut self, value: ValidValue) -> Self {
        self.valid_values.push(value);
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn with_null_value(mut self, value: PrimitiveValue) -> Self {
        self.null_value = Some(value);
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One bit of a set
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    name: String,
    bit: u32,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
}

impl Choice {
    pub fn new<S: Into<String>>(name: S, bit: u32) -> Self {
        Choice {
            name: name.into(),
            bit,
            since_version: 0,
            deprecated: None,
            description: None,
        }
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An unsigned primitive interpreted as a bit set of named choices
#[derive(Debug, Clone, PartialEq)]
pub struct SetType {
    name: String,
    encoding_type: PrimitiveType,
    choices: Vec<Choice>,
    semantic_type: Option<String>,
    offset: Option<usize>,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
}

impl SetType {
    pub fn new<S: Into<String>>(name: S, encoding_type: PrimitiveType) -> Self {
        SetType {
            name: name.into(),
            encoding_type,
            choices: Vec::new(),
            semantic_type: None,
            offset: None,
            since_version: 0,
            deprecated: None,
            description: None,
        }
    }

    pub fn choice<S: Into<String>>(self, name: S, bit: u32) -> Self {
        self.with_choice(Choice::new(name, bit))
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A fixed layout of member types
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeType {
    name: String,
    members: Vec<Type>,
    semantic_type: Option<String>,
    offset: Option<usize>,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
}

impl CompositeType {
    pub fn new<S: Into<String>>(name: S) -> Self {
        CompositeType {
            name: name.into(),
            members: Vec::new(),
            semantic_type: None,
            offset: None,
            since_version: 0,
            deprecated: None,
            description: None,
        }
    }

    pub fn member<T: Into<Type>>(mut self, member: T) -> Self {
        self.members.push(member.into());
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The standard `messageHeader`: four `uint16` members
    pub fn message_header() -> Self {
        CompositeType::new("messageHeader")
            .member(EncodedType::new("blockLength", PrimitiveType::UInt16))
            .member(EncodedType::new("templateId", PrimitiveType::UInt16))
            .member(EncodedType::new("schemaId", PrimitiveType::UInt16))
            .member(EncodedType::new("version", PrimitiveType::UInt16))
    }

    /// The standard `groupSizeEncoding`: `uint16` block length and count
    pub fn group_size_encoding() -> Self {
        CompositeType::new("groupSizeEncoding")
            .member(EncodedType::new("blockLength", PrimitiveType::UInt16))
            .member(EncodedType::new("numInGroup", PrimitiveType::UInt16))
    }

    /// The standard `varDataEncoding`: `uint32` length followed by opaque bytes
    pub fn var_data_encoding() -> Self {
        CompositeType::new("varDataEncoding")
            .member(EncodedType::new("length", PrimitiveType::UInt32))
            .member(EncodedType::new("varData", PrimitiveType::UInt8).with_length(0))
    }

    /// `uint32` length followed by UTF-8 text
    pub fn var_string_encoding() -> Self {
        CompositeType::new("varStringEncoding")
            .member(EncodedType::new("length", PrimitiveType::UInt32))
            .member(
                EncodedType::new("varData", PrimitiveType::Char)
                    .with_length(0)
                    .with_character_encoding("UTF-8"),
            )
    }

    /// Member offsets and the total encoded length
    fn layout(&self) -> Result<(Vec<usize>, usize), Error> {
        let mut offsets = Vec::with_capacity(self.members.len());
        let mut running = 0;
        for member in &self.members {
            let offset = match member.offset() {
                Some(x) if x < running => {
                    return Err(Error::invalid_ir(format!(
                        "offset of {} overlaps preceding members of composite {}",
                        member.name(),
                        self.name
                    )))
                }
                Some(x) => x,
                None => running,
            };
            offsets.push(offset);
            running = offset + member.encoded_length()?;
        }

        Ok((offsets, running))
    }

    fn find(&self, name: &str) -> Option<&Type> {
        self.members.iter().find(|x| x.name() == name)
    }
}

/// Any type a field or composite member may reference
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Encoded(EncodedType),
    Enum(EnumType),
    Set(SetType),
    Composite(CompositeType),
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::Encoded(x) => &x.name,
            Type::Enum(x) => &x.name,
            Type::Set(x) => &x.name,
            Type::Composite(x) => &x.name,
        }
    }

    fn offset(&self) -> Option<usize> {
        match self {
            Type::Encoded(x) => x.offset,
            Type::Enum(x) => x.offset,
            Type::Set(x) => x.offset,
            Type::Composite(x) => x.offset,
        }
    }

    fn since_version(&self) -> u32 {
        match self {
            Type::Encoded(x) => x.since_version,
            Type::Enum(x) => x.since_version,
            Type::Set(x) => x.since_version,
            Type::Composite(x) => x.since_version,
        }
    }

    fn presence(&self) -> Presence {
        match self {
            Type::Encoded(x) => x.presence,
            Type::Enum(x) => x.presence,
            _ => Presence::Required,
        }
    }

    pub fn encoded_length(&self) -> Result<usize, Error> {
        match self {
            Type::Encoded(x) => Ok(x.encoded_length()),
            Type::Enum(x) => Ok(x.encoding_type.size()),
            Type::Set(x) => Ok(x.encoding_type.size()),
            Type::Composite(x) => x.layout().map(|(_, len)| len),
        }
    }
}

impl From<EncodedType> for Type {
    fn from(x: EncodedType) -> Self {
        Type::Encoded(x)
    }
}

impl From<EnumType> for Type {
    fn from(x: EnumType) -> Self {
        Type::Enum(x)
    }
}

impl From<SetType> for Type {
    fn from(x: SetType) -> Self {
        Type::Set(x)
    }
}

impl From<CompositeType> for Type {
    fn from(x: CompositeType) -> Self {
        Type::Composite(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldKind {
    Scalar(Type),
    Group {
        dimension: CompositeType,
        block_length: Option<usize>,
        fields: Vec<Field>,
    },
    Data(CompositeType),
}

/// A message or group member: a typed field, a repeating group, or
/// variable length data
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    id: u32,
    kind: FieldKind,
    offset: Option<usize>,
    since_version: u32,
    deprecated: Option<u32>,
    description: Option<String>,
    semantic_type: Option<String>,
    epoch: Option<String>,
    time_unit: Option<String>,
}

impl Field {
    fn with_kind<S: Into<String>>(name: S, id: u32, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            id,
            kind,
            offset: None,
            since_version: 0,
            deprecated: None,
            description: None,
            semantic_type: None,
            epoch: None,
            time_unit: None,
        }
    }

    pub fn new<S: Into<String>, T: Into<Type>>(name: S, id: u32, ty: T) -> Self {
        Field::with_kind(name, id, FieldKind::Scalar(ty.into()))
    }

    /// A repeating group using the standard `groupSizeEncoding` dimension
    pub fn group<S: Into<String>>(name: S, id: u32, fields: Vec<Field>) -> Self {
        Field::with_kind(
            name,
            id,
            FieldKind::Group {
                dimension: CompositeType::group_size_encoding(),
                block_length: None,
                fields,
            },
        )
    }

    /// Variable length data using the standard `varDataEncoding`
    pub fn data<S: Into<String>>(name: S, id: u32) -> Self {
        Field::with_kind(name, id, FieldKind::Data(CompositeType::var_data_encoding()))
    }

    /// Replace the dimension composite of a group. Has no effect on other
    /// kinds of fields.
    pub fn with_dimension(mut self, dimension: CompositeType) -> Self {
        if let FieldKind::Group { dimension: ref mut x, .. } = self.kind {
            *x = dimension;
        }
        self
    }

    /// Declare the block length of a group, which may exceed what its
    /// fields need. Has no effect on other kinds of fields.
    pub fn with_block_length(mut self, length: usize) -> Self {
        if let FieldKind::Group {
            block_length: ref mut x,
            ..
        } = self.kind
        {
            *x = Some(length);
        }
        self
    }

    /// Replace the length/payload composite of variable length data. Has no
    /// effect on other kinds of fields.
    pub fn with_var_data_encoding(mut self, encoding: CompositeType) -> Self {
        if let FieldKind::Data(ref mut x) = self.kind {
            *x = encoding;
        }
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
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

    fn rank(&self) -> u8 {
        match self.kind {
            FieldKind::Scalar(_) => 0,
            FieldKind::Group { .. } => 1,
            FieldKind::Data(_) => 2,
        }
    }
}

/// A message template
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    name: String,
    id: u64,
    block_length: Option<usize>,
    fields: Vec<Field>,
    since_version: u32,
    deprecated: Option<u32>,
    semantic_type: Option<String>,
    description: Option<String>,
}

impl Message {
    pub fn new<S: Into<String>>(name: S, id: u64) -> Self {
        Message {
            name: name.into(),
            id,
            block_length: None,
            fields: Vec::new(),
            since_version: 0,
            deprecated: None,
            semantic_type: None,
            description: None,
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a block length larger than the fields need
    pub fn with_block_length(mut self, length: usize) -> Self {
        self.block_length = Some(length);
        self
    }

    pub fn with_since_version(mut self, version: u32) -> Self {
        self.since_version = version;
        self
    }

    pub fn with_deprecated(mut self, version: u32) -> Self {
        self.deprecated = Some(version);
        self
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, semantic_type: S) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Compiles a schema model into an [`Ir`]
#[derive(Debug, Clone)]
pub struct IrBuilder {
    package_name: String,
    namespace_name: Option<String>,
    id: u64,
    version: u32,
    semantic_version: Option<String>,
    byte_order: ByteOrder,
    header: CompositeType,
    messages: Vec<Message>,
}

impl IrBuilder {
    /// Start a schema with the given id and version, little endian byte
    /// order, and the standard message header
    pub fn new<S: Into<String>>(package_name: S, id: u64, version: u32) -> Self {
        IrBuilder {
            package_name: package_name.into(),
            namespace_name: None,
            id,
            version,
            semantic_version: None,
            byte_order: ByteOrder::LittleEndian,
            header: CompositeType::message_header(),
            messages: Vec::new(),
        }
    }

    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn header(mut self, header: CompositeType) -> Self {
        self.header = header;
        self
    }

    pub fn namespace_name<S: Into<String>>(mut self, name: S) -> Self {
        self.namespace_name = Some(name.into());
        self
    }

    pub fn semantic_version<S: Into<String>>(mut self, version: S) -> Self {
        self.semantic_version = Some(version.into());
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn build(&self) -> Result<Ir, Error> {
        for name in ["blockLength", "templateId", "schemaId", "version"] {
            require_integer_member(&self.header, name)?;
        }

        let header = IrBuilder::flatten_composite(&self.header, self.byte_order)?;
        let mut ir = Ir::new(
            self.package_name.clone(),
            self.id,
            self.version,
            self.byte_order,
            header,
        )?;

        if let Some(name) = &self.namespace_name {
            ir = ir.with_namespace_name(name.clone());
        }

        if let Some(version) = &self.semantic_version {
            ir = ir.with_semantic_version(version.clone());
        }

        for message in &self.messages {
            let mut flattener = Flattener::new(self.byte_order);
            flattener.add_message(message)?;
            for (name, start, end) in &flattener.types {
                ir.add_type(name.clone(), flattener.tokens[*start..=*end].to_vec())?;
            }
            ir.add_message(message.id, flattener.tokens)?;
        }

        Ok(ir)
    }

    /// Flatten a standalone composite, such as a message header
    pub fn flatten_composite(
        composite: &CompositeType,
        byte_order: ByteOrder,
    ) -> Result<Vec<Token>, Error> {
        let mut flattener = Flattener::new(byte_order);
        flattener.add_composite(composite, 0, 0)?;
        Ok(flattener.tokens)
    }
}

fn require_integer_member(composite: &CompositeType, name: &str) -> Result<(), Error> {
    match composite.find(name) {
        Some(Type::Encoded(x)) if !x.primitive_type.is_float() && x.length == 1 => Ok(()),
        _ => Err(Error::invalid_ir(format!(
            "composite {} requires an integer member named {}",
            composite.name, name
        ))),
    }
}

/// Offsets of the fixed size fields of a block and the resulting block length
fn block_layout(
    owner: &str,
    fields: &[Field],
    declared: Option<usize>,
) -> Result<(Vec<usize>, usize), Error> {
    let mut rank = 0;
    let mut offsets = Vec::with_capacity(fields.len());
    let mut running = 0;
    for field in fields {
        if field.rank() < rank {
            return Err(Error::invalid_ir(format!(
                "{} must declare fields before groups and groups before data: {}",
                owner, field.name
            )));
        }
        rank = field.rank();

        if let FieldKind::Scalar(ty) = &field.kind {
            let offset = match field.offset {
                Some(x) if x < running => {
                    return Err(Error::invalid_ir(format!(
                        "offset of field {} in {} overlaps preceding fields",
                        field.name, owner
                    )))
                }
                Some(x) => x,
                None => running,
            };
            offsets.push(offset);
            running = offset + ty.encoded_length()?;
        }
    }

    match declared {
        Some(x) if x < running => Err(Error::invalid_ir(format!(
            "declared block length {} of {} is less than the {} bytes required",
            x, owner, running
        ))),
        Some(x) => Ok((offsets, x)),
        None => Ok((offsets, running)),
    }
}

struct Flattener {
    tokens: Vec<Token>,
    types: Vec<(String, usize, usize)>,
    byte_order: ByteOrder,
}

impl Flattener {
    fn new(byte_order: ByteOrder) -> Self {
        Flattener {
            tokens: Vec::new(),
            types: Vec::new(),
            byte_order,
        }
    }

    fn begin(&mut self, token: Token) -> usize {
        self.tokens.push(token);
        self.tokens.len() - 1
    }

    fn end(&mut self, begin: usize, token: Token) -> usize {
        self.tokens.push(token);
        let end = self.tokens.len() - 1;
        self.tokens[begin].set_component_token_count(end - begin + 1);
        end
    }

    fn encoding(&self, ty: PrimitiveType) -> Encoding {
        Encoding::new(ty, self.byte_order)
    }

    fn add_message(&mut self, message: &Message) -> Result<(), Error> {
        let (offsets, block_length) =
            block_layout(&message.name, &message.fields, message.block_length)?;

        let mut encoding = Encoding::default();
        if let Some(x) = &message.semantic_type {
            encoding = encoding.with_semantic_type(x.clone());
        }

        let mut token = Token::new(Signal::BeginMessage, message.name.clone())
            .with_version(message.since_version)
            .with_encoded_length(block_length)
            .with_offset(0)
            .with_encoding(encoding);
        token = decorate(token, message.deprecated, message.description.as_deref());
        if let Ok(id) = u32::try_from(message.id) {
            token = token.with_id(id);
        }

        let begin = self.begin(token);
        self.add_fields(&message.fields, &offsets, message.since_version)?;
        self.end(begin, Token::new(Signal::EndMessage, message.name.clone()));
        Ok(())
    }

    fn add_fields(&mut self, fields: &[Field], offsets: &[usize], version: u32) -> Result<(), Error> {
        let mut offsets = offsets.iter();
        for field in fields {
            let field_version = version.max(field.since_version);
            match &field.kind {
                FieldKind::Scalar(ty) => {
                    let offset = offsets.next().copied().unwrap_or_default();
                    self.add_field(field, ty, offset, field_version)?;
                }
                FieldKind::Group {
                    dimension,
                    block_length,
                    fields,
                } => self.add_group(field, dimension, *block_length, fields, field_version)?,
                FieldKind::Data(encoding) => self.add_data(field, encoding, field_version)?,
            }
        }

        Ok(())
    }

    fn add_field(&mut self, field: &Field, ty: &Type, offset: usize, version: u32) -> Result<(), Error> {
        let mut encoding = Encoding::default().with_presence(ty.presence());
        if let Some(x) = &field.semantic_type {
            encoding = encoding.with_semantic_type(x.clone());
        }
        if let Some(x) = &field.epoch {
            encoding = encoding.with_epoch(x.clone());
        }
        if let Some(x) = &field.time_unit {
            encoding = encoding.with_time_unit(x.clone());
        }

        let token = Token::new(Signal::BeginField, field.name.clone())
            .with_id(field.id)
            .with_version(version)
            .with_offset(offset)
            .with_encoded_length(ty.encoded_length()?)
            .with_referenced_name(ty.name())
            .with_encoding(encoding);
        let token = decorate(token, field.deprecated, field.description.as_deref());

        let begin = self.begin(token);
        self.add_type(ty, offset, version)?;
        self.end(
            begin,
            Token::new(Signal::EndField, field.name.clone()).with_id(field.id),
        );
        Ok(())
    }

    fn add_group(
        &mut self,
        field: &Field,
        dimension: &CompositeType,
        declared: Option<usize>,
        fields: &[Field],
        version: u32,
    ) -> Result<(), Error> {
        require_integer_member(dimension, "blockLength")?;
        require_integer_member(dimension, "numInGroup")?;
        let (offsets, block_length) = block_layout(&field.name, fields, declared)?;

        let token = Token::new(Signal::BeginGroup, field.name.clone())
            .with_id(field.id)
            .with_version(version)
            .with_encoded_length(block_length);
        let token = decorate(token, field.deprecated, field.description.as_deref());

        let begin = self.begin(token);
        self.add_composite(dimension, 0, version)?;
        self.add_fields(fields, &offsets, version)?;
        self.end(
            begin,
            Token::new(Signal::EndGroup, field.name.clone()).with_id(field.id),
        );
        Ok(())
    }

    fn add_data(&mut self, field: &Field, encoding: &CompositeType, version: u32) -> Result<(), Error> {
        require_integer_member(encoding, "length")?;
        match encoding.find("varData") {
            Some(Type::Encoded(x)) if x.length == 0 => {}
            _ => {
                return Err(Error::invalid_ir(format!(
                    "var data encoding {} requires a zero length member named varData",
                    encoding.name
                )))
            }
        }

        let token = Token::new(Signal::BeginVarData, field.name.clone())
            .with_id(field.id)
            .with_version(version);
        let token = decorate(token, field.deprecated, field.description.as_deref());

        let begin = self.begin(token);
        self.add_composite(encoding, 0, version)?;
        self.end(
            begin,
            Token::new(Signal::EndVarData, field.name.clone()).with_id(field.id),
        );
        Ok(())
    }

    fn add_type(&mut self, ty: &Type, offset: usize, version: u32) -> Result<(), Error> {
        let version = version.max(ty.since_version());
        match ty {
            Type::Encoded(x) => self.add_encoded(x, offset, version),
            Type::Enum(x) => self.add_enum(x, offset, version),
            Type::Set(x) => self.add_set(x, offset, version),
            Type::Composite(x) => self.add_composite(x, offset, version),
        }
    }

    fn add_encoded(&mut self, ty: &EncodedType, offset: usize, version: u32) -> Result<(), Error> {
        let mut encoding = self.encoding(ty.primitive_type).with_presence(ty.presence);
        if let Some(x) = ty.min_value {
            encoding = encoding.with_min_value(x);
        }
        if let Some(x) = ty.max_value {
            encoding = encoding.with_max_value(x);
        }
        if let Some(x) = ty.null_value {
            encoding = encoding.with_null_value(x);
        }
        if let Some(x) = &ty.character_encoding {
            encoding = encoding.with_character_encoding(x.clone());
        }
        if let Some(x) = &ty.semantic_type {
            encoding = encoding.with_semantic_type(x.clone());
        }
        match &ty.const_value {
            Some(ConstValue::Scalar(x)) => encoding = encoding.with_const_value(*x),
            Some(ConstValue::Bytes(x)) => encoding = encoding.with_const_bytes(x.clone()),
            None if ty.presence == Presence::Constant => {
                return Err(Error::invalid_ir(format!(
                    "constant type {} lacks a value",
                    ty.name
                )))
            }
            None => {}
        }

        let token = Token::new(Signal::Encoding, ty.name.clone())
            .with_version(version)
            .with_offset(offset)
            .with_encoded_length(ty.encoded_length())
            .with_encoding(encoding);
        let token = decorate(token, ty.deprecated, ty.description.as_deref());
        self.tokens.push(token);
        Ok(())
    }

    fn add_enum(&mut self, ty: &EnumType, offset: usize, version: u32) -> Result<(), Error> {
        let size = ty.encoding_type.size();
        let mut encoding = self.encoding(ty.encoding_type).with_presence(ty.presence);
        if let Some(x) = ty.null_value {
            encoding = encoding.with_null_value(x);
        }
        if let Some(x) = &ty.semantic_type {
            encoding = encoding.with_semantic_type(x.clone());
        }

        let token = Token::new(Signal::BeginEnum, ty.name.clone())
            .with_version(version)
            .with_offset(offset)
            .with_encoded_length(size)
            .with_encoding(encoding);
        let token = decorate(token, ty.deprecated, ty.description.as_deref());

        let begin = self.begin(token);
        for value in &ty.valid_values {
            let encoding = self
                .encoding(ty.encoding_type)
                .with_presence(Presence::Constant)
                .with_const_value(value.value);
            let token = Token::new(Signal::ValidValue, value.name.clone())
                .with_version(version.max(value.since_version))
                .with_encoded_length(size)
                .with_encoding(encoding);
            let token = decorate(token, value.deprecated, value.description.as_deref());
            self.tokens.push(token);
        }

        let end = self.end(begin, Token::new(Signal::EndEnum, ty.name.clone()));
        self.types.push((ty.name.clone(), begin, end));
        Ok(())
    }

    fn add_set(&mut self, ty: &SetType, offset: usize, version: u32) -> Result<(), Error> {
        if !ty.encoding_type.is_unsigned() {
            return Err(Error::invalid_ir(format!(
                "set {} must use an unsigned encoding type",
                ty.name
            )));
        }

        let size = ty.encoding_type.size();
        let mut encoding = self.encoding(ty.encoding_type);
        if let Some(x) = &ty.semantic_type {
            encoding = encoding.with_semantic_type(x.clone());
        }

        let token = Token::new(Signal::BeginSet, ty.name.clone())
            .with_version(version)
            .with_offset(offset)
            .with_encoded_length(size)
            .with_encoding(encoding);
        let token = decorate(token, ty.deprecated, ty.description.as_deref());

        let begin = self.begin(token);
        for choice in &ty.choices {
            if choice.bit as usize >= size * 8 {
                return Err(Error::invalid_ir(format!(
                    "choice {} of set {} is outside of the {} bit encoding",
                    choice.name,
                    ty.name,
                    size * 8
                )));
            }

            let encoding = self
                .encoding(ty.encoding_type)
                .with_presence(Presence::Constant)
                .with_const_value(PrimitiveValue::from(choice.bit));
            let token = Token::new(Signal::Choice, choice.name.clone())
                .with_version(version.max(choice.since_version))
                .with_encoded_length(size)
                .with_encoding(encoding);
            let token = decorate(token, choice.deprecated, choice.description.as_deref());
            self.tokens.push(token);
        }

        let end = self.end(begin, Token::new(Signal::EndSet, ty.name.clone()));
        self.types.push((ty.name.clone(), begin, end));
        Ok(())
    }

    fn add_composite(&mut self, ty: &CompositeType, offset: usize, version: u32) -> Result<(), Error> {
        let (offsets, length) = ty.layout()?;
        let mut encoding = Encoding::default();
        if let Some(x) = &ty.semantic_type {
            encoding = encoding.with_semantic_type(x.clone());
        }

        let token = Token::new(Signal::BeginComposite, ty.name.clone())
            .with_version(version)
            .with_offset(offset)
            .with_encoded_length(length)
            .with_encoding(encoding);
        let token = decorate(token, ty.deprecated, ty.description.as_deref());

        let begin = self.begin(token);
        for (member, member_offset) in ty.members.iter().zip(offsets) {
            self.add_type(member, member_offset, version)?;
        }

        let end = self.end(begin, Token::new(Signal::EndComposite, ty.name.clone()));
        self.types.push((ty.name.clone(), begin, end));
        Ok(())
    }
}

fn decorate(mut token: Token, deprecated: Option<u32>, description: Option<&str>) -> Token {
    if let Some(x) = deprecated {
        token = token.with_deprecated(x);
    }
    if let Some(x) = description {
        token = token.with_description(x);
    }
    token
}
