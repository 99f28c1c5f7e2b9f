use crate::{ir::Token, Error, FieldValue, PrimitiveValue};

/// Receives the events of a decode in schema order
///
/// Every method has a no-op default so implementations only override what
/// they care about. Returning an error stops the decode and the error is
/// handed back to the caller unchanged.
///
/// Tokens and buffer slices borrow for `'a`, so a listener may hold on to
/// them for as long as the IR and buffer live.
///
/// ```
/// use sbe_otf::{Error, FieldValue, Token, TokenListener};
///
/// #[derive(Default)]
/// struct Names<'a>(Vec<&'a str>);
///
/// impl<'a> TokenListener<'a> for Names<'a> {
///     fn on_encoding(
///         &mut self,
///         field: &'a Token,
///         _type_token: &'a Token,
///         _value: FieldValue<'a>,
///         _offset: usize,
///     ) -> Result<(), Error> {
///         self.0.push(field.name());
///         Ok(())
///     }
/// }
/// ```
pub trait TokenListener<'a> {
    fn on_begin_message(&mut self, token: &'a Token) -> Result<(), Error> {
        let _ = token;
        Ok(())
    }

    fn on_end_message(&mut self, token: &'a Token) -> Result<(), Error> {
        let _ = token;
        Ok(())
    }

    /// A primitive or fixed length array. `field` is the enclosing
    /// `BEGIN_FIELD`, or for composite members the member's own token.
    /// Constant encodings report the schema value and the offset at which
    /// they would sit, though they occupy no bytes.
    fn on_encoding(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: FieldValue<'a>,
        offset: usize,
    ) -> Result<(), Error> {
        let _ = (field, type_token, value, offset);
        Ok(())
    }

    /// An enum value along with the literal it matched, or `None` when the
    /// value is not declared by the schema
    fn on_enum(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: PrimitiveValue,
        valid_value: Option<&'a Token>,
        offset: usize,
    ) -> Result<(), Error> {
        let _ = (field, type_token, value, valid_value, offset);
        Ok(())
    }

    /// A bit set. `choices` are the `CHOICE` tokens of the set;
    /// [`set_choices`] narrows them to the bits that are on.
    fn on_bit_set(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: u64,
        choices: &'a [Token],
        offset: usize,
    ) -> Result<(), Error> {
        let _ = (field, type_token, value, choices, offset);
        Ok(())
    }

    fn on_begin_composite(&mut self, field: &'a Token, type_token: &'a Token) -> Result<(), Error> {
        let _ = (field, type_token);
        Ok(())
    }

    fn on_end_composite(&mut self, field: &'a Token, type_token: &'a Token) -> Result<(), Error> {
        let _ = (field, type_token);
        Ok(())
    }

    /// Emitted once per group occurrence, before any elements.
    /// `block_length` is the element block length the encoder declared.
    fn on_group_header(&mut self, token: &'a Token, num_in_group: u64, block_length: u64) -> Result<(), Error> {
        let _ = (token, num_in_group, block_length);
        Ok(())
    }

    fn on_begin_group(&mut self, token: &'a Token, index: u64, num_in_group: u64) -> Result<(), Error> {
        let _ = (token, index, num_in_group);
        Ok(())
    }

    fn on_end_group(&mut self, token: &'a Token, index: u64, num_in_group: u64) -> Result<(), Error> {
        let _ = (token, index, num_in_group);
        Ok(())
    }

    /// Emitted after the last element of a group, and directly after
    /// [`on_group_header`](TokenListener::on_group_header) when the group
    /// is empty
    fn on_group_end(&mut self, token: &'a Token, num_in_group: u64) -> Result<(), Error> {
        let _ = (token, num_in_group);
        Ok(())
    }

    /// Variable length data. `data` is the payload only, without the length
    /// prefix, and `offset` is where the payload starts.
    fn on_var_data(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        data: &'a [u8],
        offset: usize,
    ) -> Result<(), Error> {
        let _ = (field, type_token, data, offset);
        Ok(())
    }
}

impl<'a, T> TokenListener<'a> for &mut T
where
    T: TokenListener<'a> + ?Sized,
{
    fn on_begin_message(&mut self, token: &'a Token) -> Result<(), Error> {
        (**self).on_begin_message(token)
    }

    fn on_end_message(&mut self, token: &'a Token) -> Result<(), Error> {
        (**self).on_end_message(token)
    }

    fn on_encoding(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: FieldValue<'a>,
        offset: usize,
    ) -> Result<(), Error> {
        (**self).on_encoding(field, type_token, value, offset)
    }

    fn on_enum(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: PrimitiveValue,
        valid_value: Option<&'a Token>,
        offset: usize,
    ) -> Result<(), Error> {
        (**self).on_enum(field, type_token, value, valid_value, offset)
    }

    fn on_bit_set(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        value: u64,
        choices: &'a [Token],
        offset: usize,
    ) -> Result<(), Error> {
        (**self).on_bit_set(field, type_token, value, choices, offset)
    }

    fn on_begin_composite(&mut self, field: &'a Token, type_token: &'a Token) -> Result<(), Error> {
        (**self).on_begin_composite(field, type_token)
    }

    fn on_end_composite(&mut self, field: &'a Token, type_token: &'a Token) -> Result<(), Error> {
        (**self).on_end_composite(field, type_token)
    }

    fn on_group_header(&mut self, token: &'a Token, num_in_group: u64, block_length: u64) -> Result<(), Error> {
        (**self).on_group_header(token, num_in_group, block_length)
    }

    fn on_begin_group(&mut self, token: &'a Token, index: u64, num_in_group: u64) -> Result<(), Error> {
        (**self).on_begin_group(token, index, num_in_group)
    }

    fn on_end_group(&mut self, token: &'a Token, index: u64, num_in_group: u64) -> Result<(), Error> {
        (**self).on_end_group(token, index, num_in_group)
    }

    fn on_group_end(&mut self, token: &'a Token, num_in_group: u64) -> Result<(), Error> {
        (**self).on_group_end(token, num_in_group)
    }

    fn on_var_data(
        &mut self,
        field: &'a Token,
        type_token: &'a Token,
        data: &'a [u8],
        offset: usize,
    ) -> Result<(), Error> {
        (**self).on_var_data(field, type_token, data, offset)
    }
}

/// The choices whose bit is set in `value`, in declared order
///
/// ```
/// use sbe_otf::{otf::set_choices, ByteOrder, Encoding, Presence, PrimitiveType, PrimitiveValue, Signal, Token};
///
/// let choice = |name: &str, bit: u64| {
///     Token::new(Signal::Choice, name).with_encoding(
///         Encoding::new(PrimitiveType::UInt8, ByteOrder::LittleEndian)
///             .with_presence(Presence::Constant)
///             .with_const_value(PrimitiveValue::UInt(bit)),
///     )
/// };
///
/// let choices = vec![choice("a", 0), choice("b", 1), choice("c", 2)];
/// let names: Vec<_> = set_choices(&choices, 0b101).map(|x| x.name()).collect();
/// assert_eq!(names, vec!["a", "c"]);
/// ```
pub fn set_choices(choices: &[Token], value: u64) -> impl Iterator<Item = &Token> {
    choices.iter().filter(move |choice| {
        choice_bit(choice)
            .and_then(|bit| value.checked_shr(bit))
            .is_some_and(|x| x & 1 == 1)
    })
}

fn choice_bit(choice: &Token) -> Option<u32> {
    let bit = choice.encoding().const_value()?.scalar()?.as_u64()?;
    u32::try_from(bit).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ByteOrder, Encoding, Presence, PrimitiveType, Signal};

    fn choice(name: &str, bit: u64) -> Token {
        Token::new(Signal::Choice, name).with_encoding(
            Encoding::new(PrimitiveType::UInt64, ByteOrder::LittleEndian)
                .with_presence(Presence::Constant)
                .with_const_value(PrimitiveValue::UInt(bit)),
        )
    }

    #[test]
    fn test_set_choices_high_bits() {
        let choices = vec![choice("low", 0), choice("high", 63), choice("bogus", 64)];
        let names: Vec<_> = set_choices(&choices, u64::MAX).map(|x| x.name()).collect();
        assert_eq!(names, vec!["low", "high"]);
        assert_eq!(set_choices(&choices, 0).count(), 0);
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct Nothing;
        impl<'a> TokenListener<'a> for Nothing {}

        let token = Token::new(Signal::BeginGroup, "g");
        let mut listener = Nothing;
        let by_ref = &mut listener;
        assert!(by_ref.on_group_header(&token, 3, 8).is_ok());
        assert!(by_ref.on_begin_group(&token, 0, 3).is_ok());
        assert!(by_ref.on_group_end(&token, 3).is_ok());
    }
}
