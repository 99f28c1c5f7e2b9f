use std::fmt;

/// Role of a token within the flattened schema tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Signal {
    BeginMessage,
    EndMessage,
    BeginComposite,
    EndComposite,
    BeginField,
    EndField,
    BeginGroup,
    EndGroup,
    BeginEnum,
    ValidValue,
    EndEnum,
    BeginSet,
    Choice,
    EndSet,
    BeginVarData,
    EndVarData,
    Encoding,
}

impl Signal {
    /// Returns the closing signal for an opening signal
    ///
    /// ```
    /// use sbe_otf::Signal;
    ///
    /// assert_eq!(Signal::BeginGroup.end(), Some(Signal::EndGroup));
    /// assert_eq!(Signal::Encoding.end(), None);
    /// ```
    pub const fn end(self) -> Option<Signal> {
        match self {
            Signal::BeginMessage => Some(Signal::EndMessage),
            Signal::BeginComposite => Some(Signal::EndComposite),
            Signal::BeginField => Some(Signal::EndField),
            Signal::BeginGroup => Some(Signal::EndGroup),
            Signal::BeginEnum => Some(Signal::EndEnum),
            Signal::BeginSet => Some(Signal::EndSet),
            Signal::BeginVarData => Some(Signal::EndVarData),
            _ => None,
        }
    }

    pub const fn is_begin(self) -> bool {
        self.end().is_some()
    }

    pub const fn is_end(self) -> bool {
        matches!(
            self,
            Signal::EndMessage
                | Signal::EndComposite
                | Signal::EndField
                | Signal::EndGroup
                | Signal::EndEnum
                | Signal::EndSet
                | Signal::EndVarData
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Signal::BeginMessage => "BEGIN_MESSAGE",
            Signal::EndMessage => "END_MESSAGE",
            Signal::BeginComposite => "BEGIN_COMPOSITE",
            Signal::EndComposite => "END_COMPOSITE",
            Signal::BeginField => "BEGIN_FIELD",
            Signal::EndField => "END_FIELD",
            Signal::BeginGroup => "BEGIN_GROUP",
            Signal::EndGroup => "END_GROUP",
            Signal::BeginEnum => "BEGIN_ENUM",
            Signal::ValidValue => "VALID_VALUE",
            Signal::EndEnum => "END_ENUM",
            Signal::BeginSet => "BEGIN_SET",
            Signal::Choice => "CHOICE",
            Signal::EndSet => "END_SET",
            Signal::BeginVarData => "BEGIN_VAR_DATA",
            Signal::EndVarData => "END_VAR_DATA",
            Signal::Encoding => "ENCODING",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
