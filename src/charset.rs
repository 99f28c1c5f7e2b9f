use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Character encoding declared for `char` arrays and variable length text
///
/// The ascii fast path borrows from the input; anything else allocates.
///
/// ```
/// use sbe_otf::CharacterEncoding;
///
/// assert_eq!(CharacterEncoding::Utf8.decode("Jåhkåmåhkke".as_bytes()), "Jåhkåmåhkke");
/// assert_eq!(CharacterEncoding::Latin1.decode(b"\xe5"), "å");
/// assert_eq!(CharacterEncoding::Windows1252.decode(b"\x80"), "€");
/// assert_eq!(CharacterEncoding::Ascii.decode(b"\xe5"), "\u{fffd}");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharacterEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Windows1252,
}

impl CharacterEncoding {
    /// Resolve a schema declared encoding name. Unrecognized names yield
    /// `None` and callers should treat the data as opaque bytes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(CharacterEncoding::Utf8),
            "ascii" | "us-ascii" => Some(CharacterEncoding::Ascii),
            "iso-8859-1" | "iso_8859_1" | "latin1" => Some(CharacterEncoding::Latin1),
            "windows-1252" | "cp1252" => Some(CharacterEncoding::Windows1252),
            _ => None,
        }
    }

    pub fn decode<'a>(&self, data: &'a [u8]) -> Cow<'a, str> {
        if data.is_ascii() {
            // ascii is a subset of every supported encoding
            return match std::str::from_utf8(data) {
                Ok(s) => Cow::Borrowed(s),
                Err(_) => String::from_utf8_lossy(data),
            };
        }

        match self {
            CharacterEncoding::Utf8 => String::from_utf8_lossy(data),
            CharacterEncoding::Ascii => Cow::Owned(
                data.iter()
                    .map(|&x| if x.is_ascii() { char::from(x) } else { '\u{fffd}' })
                    .collect(),
            ),
            CharacterEncoding::Latin1 => Cow::Owned(data.iter().map(|&x| char::from(x)).collect()),
            CharacterEncoding::Windows1252 => {
                Cow::Owned(data.iter().map(|&x| windows_1252_char(x)).collect())
            }
        }
    }
}

impl FromStr for CharacterEncoding {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CharacterEncoding::from_name(s)
            .ok_or_else(|| crate::Error::invalid_ir(format!("unknown character encoding: {}", s)))
    }
}

impl fmt::Display for CharacterEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CharacterEncoding::Utf8 => "UTF-8",
            CharacterEncoding::Ascii => "US-ASCII",
            CharacterEncoding::Latin1 => "ISO-8859-1",
            CharacterEncoding::Windows1252 => "windows-1252",
        };
        f.write_str(name)
    }
}

/// Windows-1252 only differs from latin1 in the 0x80..0xa0 range. Undefined
/// positions map to the C1 control codes, as the Windows API does.
const WINDOWS_1252_HIGH: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž',
    '\u{8f}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}',
    'ž', 'Ÿ',
];

#[inline]
fn windows_1252_char(b: u8) -> char {
    match b {
        0x80..=0x9f => WINDOWS_1252_HIGH[usize::from(b - 0x80)],
        x => char::from(x),
    }
}
