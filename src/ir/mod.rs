//! The flattened intermediate representation of a schema
//!
//! A schema is a tree of messages, fields, composites, groups and variable
//! length data. The IR stores that tree as a flat `Vec<Token>` per message in
//! which every construct is bracketed by `BEGIN_*`/`END_*` tokens and the
//! opening token records how many tokens the construct spans. Subtrees are
//! addressed by index and skipped in one step, so no parent/child references
//! are needed.
//!
//! An [`Ir`] is immutable once built and is `Send + Sync`, so one instance can
//! serve any number of concurrent decodes.

pub mod builder;
pub mod navigate;
mod primitive;
mod signal;
mod token;

pub use self::builder::IrBuilder;
pub use self::primitive::{ByteOrder, PrimitiveType, PrimitiveValue};
pub use self::signal::Signal;
pub use self::token::{Encoding, Presence, Token};

use crate::Error;
use std::collections::BTreeMap;

/// The compiled form of a schema: header layout plus token sequences for
/// every message keyed by template id
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Ir {
    package_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    namespace_name: Option<String>,
    id: u64,
    version: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    semantic_version: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    byte_order: ByteOrder,
    header: Vec<Token>,
    messages: BTreeMap<u64, Vec<Token>>,
    #[cfg_attr(feature = "serde", serde(default))]
    types: BTreeMap<String, Vec<Token>>,
}

impl Ir {
    /// Create an IR without any messages. The header tokens must be a
    /// bracketed composite.
    pub fn new<S: Into<String>>(
        package_name: S,
        id: u64,
        version: u32,
        byte_order: ByteOrder,
        header: Vec<Token>,
    ) -> Result<Self, Error> {
        navigate::validate(&header)?;
        if header.first().map(|x| x.signal()) != Some(Signal::BeginComposite) {
            return Err(Error::invalid_ir("header must be a composite"));
        }

        Ok(Ir {
            package_name: package_name.into(),
            namespace_name: None,
            id,
            version,
            semantic_version: None,
            byte_order,
            header,
            messages: BTreeMap::new(),
            types: BTreeMap::new(),
        })
    }

    pub fn with_namespace_name<S: Into<String>>(mut self, name: S) -> Self {
        self.namespace_name = Some(name.into());
        self
    }

    pub fn with_semantic_version<S: Into<String>>(mut self, version: S) -> Self {
        self.semantic_version = Some(version.into());
        self
    }

    /// Add the token sequence of a message. The sequence must be bracketed
    /// by `BEGIN_MESSAGE`/`END_MESSAGE` and the template id must be unique.
    pub fn add_message(&mut self, template_id: u64, tokens: Vec<Token>) -> Result<(), Error> {
        navigate::validate(&tokens)?;
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last))
                if first.signal() == Signal::BeginMessage
                    && last.signal() == Signal::EndMessage
                    && first.component_token_count() == tokens.len() => {}
            _ => {
                return Err(Error::invalid_ir(format!(
                    "template {} is not a single bracketed message",
                    template_id
                )))
            }
        }

        if self.messages.contains_key(&template_id) {
            return Err(Error::invalid_ir(format!(
                "duplicate template id: {}",
                template_id
            )));
        }

        self.messages.insert(template_id, tokens);
        Ok(())
    }

    /// Record the tokens of a named type. The first registration wins.
    pub fn add_type<S: Into<String>>(&mut self, name: S, tokens: Vec<Token>) -> Result<(), Error> {
        navigate::validate(&tokens)?;
        self.types.entry(name.into()).or_insert(tokens);
        Ok(())
    }

    /// Check every token sequence against the bracketing invariant. Useful
    /// after deserializing an IR from an untrusted source.
    pub fn validate(&self) -> Result<(), Error> {
        navigate::validate(&self.header)?;
        for tokens in self.messages.values() {
            navigate::validate(tokens)?;
        }
        for tokens in self.types.values() {
            navigate::validate(tokens)?;
        }
        Ok(())
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace_name.as_deref()
    }

    /// The schema id that message headers must carry
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The schema version the IR was compiled at
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn semantic_version(&self) -> Option<&str> {
        self.semantic_version.as_deref()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Tokens of the message header composite
    pub fn header_tokens(&self) -> &[Token] {
        &self.header
    }

    /// Tokens of a message, including the message brackets
    pub fn message(&self, template_id: u64) -> Option<&[Token]> {
        self.messages.get(&template_id).map(|x| x.as_slice())
    }

    pub fn message_by_name(&self, name: &str) -> Option<&[Token]> {
        self.messages
            .values()
            .find(|tokens| tokens.first().map(|x| x.name()) == Some(name))
            .map(|x| x.as_slice())
    }

    /// Iterate over `(template id, tokens)` in ascending template id order
    pub fn messages(&self) -> impl Iterator<Item = (u64, &[Token])> {
        self.messages.iter().map(|(id, tokens)| (*id, tokens.as_slice()))
    }

    pub fn type_tokens(&self, name: &str) -> Option<&[Token]> {
        self.types.get(name).map(|x| x.as_slice())
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &[Token])> {
        self.types
            .iter()
            .map(|(name, tokens)| (name.as_str(), tokens.as_slice()))
    }
}
