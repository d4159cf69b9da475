//! Typed runtime values stored in function block buffers.
//!
//! Every [`Value`] knows its own [`ValueKind`], so a slot handed out by a
//! type-erased lookup can always be checked before it is read or written.

use crate::error::{FbError, FbResult};
use crate::iec_types::{
    BOOL, BYTE, DINT, DWORD, INT, LINT, LREAL, LWORD, REAL, SINT, STRING, TIME, UDINT, UINT,
    ULINT, USINT, WORD,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage footprint reserved for one STRING slot (254 characters plus header).
pub const STRING_SLOT_SIZE: usize = 256;

/// Longest STRING, in bytes, that fits one slot.
pub const STRING_MAX_LEN: usize = STRING_SLOT_SIZE - 2;

fn check_string_len(text: &str) -> FbResult<()> {
    if text.len() > STRING_MAX_LEN {
        return Err(FbError::StringTooLong {
            len: text.len(),
            max: STRING_MAX_LEN,
        });
    }
    Ok(())
}

/// The closed set of elementary kinds a port or variable can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueKind {
    Bool,
    Byte,
    Word,
    DWord,
    LWord,
    SInt,
    Int,
    DInt,
    LInt,
    USInt,
    UInt,
    UDInt,
    ULInt,
    Real,
    LReal,
    Time,
    String,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 17] = [
        Self::Bool,
        Self::Byte,
        Self::Word,
        Self::DWord,
        Self::LWord,
        Self::SInt,
        Self::Int,
        Self::DInt,
        Self::LInt,
        Self::USInt,
        Self::UInt,
        Self::UDInt,
        Self::ULInt,
        Self::Real,
        Self::LReal,
        Self::Time,
        Self::String,
    ];

    /// Storage size of one value of this kind in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::Byte | Self::SInt | Self::USInt => 1,
            Self::Word | Self::Int | Self::UInt => 2,
            Self::DWord | Self::DInt | Self::UDInt | Self::Real => 4,
            Self::LWord | Self::LInt | Self::ULInt | Self::LReal | Self::Time => 8,
            Self::String => STRING_SLOT_SIZE,
        }
    }

    /// IEC 61131-3 type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Byte => "BYTE",
            Self::Word => "WORD",
            Self::DWord => "DWORD",
            Self::LWord => "LWORD",
            Self::SInt => "SINT",
            Self::Int => "INT",
            Self::DInt => "DINT",
            Self::LInt => "LINT",
            Self::USInt => "USINT",
            Self::UInt => "UINT",
            Self::UDInt => "UDINT",
            Self::ULInt => "ULINT",
            Self::Real => "REAL",
            Self::LReal => "LREAL",
            Self::Time => "TIME",
            Self::String => "STRING",
        }
    }

    /// Look up a kind by its IEC type name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Returns true for the ANY_BIT kinds (BOOL and the bit strings).
    #[must_use]
    pub fn is_any_bit(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Byte | Self::Word | Self::DWord | Self::LWord
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A self-describing runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "UPPERCASE")]
pub enum Value {
    Bool(BOOL),
    Byte(BYTE),
    Word(WORD),
    DWord(DWORD),
    LWord(LWORD),
    SInt(SINT),
    Int(INT),
    DInt(DINT),
    LInt(LINT),
    USInt(USINT),
    UInt(UINT),
    UDInt(UDINT),
    ULInt(ULINT),
    Real(REAL),
    LReal(LREAL),
    Time(TIME),
    String(STRING),
}

impl Value {
    /// Initial value of a freshly allocated slot of `kind`.
    #[must_use]
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Self::Bool(false),
            ValueKind::Byte => Self::Byte(0),
            ValueKind::Word => Self::Word(0),
            ValueKind::DWord => Self::DWord(0),
            ValueKind::LWord => Self::LWord(0),
            ValueKind::SInt => Self::SInt(0),
            ValueKind::Int => Self::Int(0),
            ValueKind::DInt => Self::DInt(0),
            ValueKind::LInt => Self::LInt(0),
            ValueKind::USInt => Self::USInt(0),
            ValueKind::UInt => Self::UInt(0),
            ValueKind::UDInt => Self::UDInt(0),
            ValueKind::ULInt => Self::ULInt(0),
            ValueKind::Real => Self::Real(0.0),
            ValueKind::LReal => Self::LReal(0.0),
            ValueKind::Time => Self::Time(0),
            ValueKind::String => Self::String(String::new()),
        }
    }

    /// The kind this value carries.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Byte(_) => ValueKind::Byte,
            Self::Word(_) => ValueKind::Word,
            Self::DWord(_) => ValueKind::DWord,
            Self::LWord(_) => ValueKind::LWord,
            Self::SInt(_) => ValueKind::SInt,
            Self::Int(_) => ValueKind::Int,
            Self::DInt(_) => ValueKind::DInt,
            Self::LInt(_) => ValueKind::LInt,
            Self::USInt(_) => ValueKind::USInt,
            Self::UInt(_) => ValueKind::UInt,
            Self::UDInt(_) => ValueKind::UDInt,
            Self::ULInt(_) => ValueKind::ULInt,
            Self::Real(_) => ValueKind::Real,
            Self::LReal(_) => ValueKind::LReal,
            Self::Time(_) => ValueKind::Time,
            Self::String(_) => ValueKind::String,
        }
    }

    /// Copy `source` into this slot. Both must carry the same kind.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::KindMismatch`] if the kinds differ, or
    /// [`FbError::StringTooLong`] for a STRING longer than a slot holds. The
    /// slot is left untouched on error.
    pub fn assign(&mut self, source: &Value) -> FbResult<()> {
        if self.kind() != source.kind() {
            return Err(FbError::KindMismatch {
                expected: self.kind(),
                found: source.kind(),
            });
        }
        if let Self::String(text) = source {
            check_string_len(text)?;
        }
        self.clone_from(source);
        Ok(())
    }

    /// Read this slot as a Rust scalar.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::KindMismatch`] if `T` cannot represent this kind.
    pub fn get<T: PortValue>(&self) -> FbResult<T> {
        T::read(self).ok_or(FbError::KindMismatch {
            expected: self.kind(),
            found: T::KIND,
        })
    }

    /// Store a Rust scalar into this slot, keeping the slot's declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::KindMismatch`] if `T` does not fit this kind, or
    /// [`FbError::StringTooLong`] if `value` exceeds the slot.
    pub fn set<T: PortValue>(&mut self, value: T) -> FbResult<()> {
        let expected = self.kind();
        value.check()?;
        if value.write(self) {
            Ok(())
        } else {
            Err(FbError::KindMismatch {
                expected,
                found: T::KIND,
            })
        }
    }

    /// Parse an IEC literal such as `TRUE`, `16#FF`, `DINT#-5`, `T#250ms` or `'text'`.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Configuration`] if the literal does not denote a value of `kind`.
    pub fn parse(kind: ValueKind, literal: &str) -> FbResult<Self> {
        let bad = || FbError::Configuration(format!("invalid {kind} literal: {literal:?}"));
        let text = strip_type_prefix(literal.trim(), kind);

        let value = match kind {
            ValueKind::Bool => match text.to_ascii_uppercase().as_str() {
                "TRUE" | "1" => Self::Bool(true),
                "FALSE" | "0" => Self::Bool(false),
                _ => return Err(bad()),
            },
            ValueKind::Byte => Self::Byte(narrow(parse_unsigned(text)).ok_or_else(bad)?),
            ValueKind::Word => Self::Word(narrow(parse_unsigned(text)).ok_or_else(bad)?),
            ValueKind::DWord => Self::DWord(narrow(parse_unsigned(text)).ok_or_else(bad)?),
            ValueKind::LWord => Self::LWord(parse_unsigned(text).ok_or_else(bad)?),
            ValueKind::USInt => Self::USInt(narrow(parse_unsigned(text)).ok_or_else(bad)?),
            ValueKind::UInt => Self::UInt(narrow(parse_unsigned(text)).ok_or_else(bad)?),
            ValueKind::UDInt => Self::UDInt(narrow(parse_unsigned(text)).ok_or_else(bad)?),
            ValueKind::ULInt => Self::ULInt(parse_unsigned(text).ok_or_else(bad)?),
            ValueKind::SInt => Self::SInt(narrow(parse_signed(text)).ok_or_else(bad)?),
            ValueKind::Int => Self::Int(narrow(parse_signed(text)).ok_or_else(bad)?),
            ValueKind::DInt => Self::DInt(narrow(parse_signed(text)).ok_or_else(bad)?),
            ValueKind::LInt => Self::LInt(parse_signed(text).ok_or_else(bad)?),
            ValueKind::Real => Self::Real(text.replace('_', "").parse().map_err(|_| bad())?),
            ValueKind::LReal => Self::LReal(text.replace('_', "").parse().map_err(|_| bad())?),
            ValueKind::Time => {
                let duration = humantime::parse_duration(text).map_err(|_| bad())?;
                Self::Time(i64::try_from(duration.as_nanos()).map_err(|_| bad())?)
            }
            ValueKind::String => {
                let unquoted = text
                    .strip_prefix('\'')
                    .and_then(|rest| rest.strip_suffix('\''))
                    .unwrap_or(text);
                if unquoted.len() > STRING_MAX_LEN {
                    return Err(bad());
                }
                Self::String(unquoted.to_string())
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.write_str(if *v { "TRUE" } else { "FALSE" }),
            Self::Byte(v) | Self::USInt(v) => write!(f, "{v}"),
            Self::Word(v) | Self::UInt(v) => write!(f, "{v}"),
            Self::DWord(v) | Self::UDInt(v) => write!(f, "{v}"),
            Self::LWord(v) | Self::ULInt(v) => write!(f, "{v}"),
            Self::SInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::DInt(v) => write!(f, "{v}"),
            Self::LInt(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::LReal(v) => write!(f, "{v}"),
            Self::Time(ns) => write!(f, "T#{ns}ns"),
            Self::String(s) => write!(f, "'{s}'"),
        }
    }
}

fn narrow<T: TryFrom<V>, V>(value: Option<V>) -> Option<T> {
    value.and_then(|v| T::try_from(v).ok())
}

/// Strip `KIND#` (and `T#` for TIME) from a literal.
fn strip_type_prefix(text: &str, kind: ValueKind) -> &str {
    if let Some((prefix, rest)) = text.split_once('#') {
        let prefix_matches = prefix.eq_ignore_ascii_case(kind.name())
            || (kind == ValueKind::Time && prefix.eq_ignore_ascii_case("T"));
        if prefix_matches {
            return rest;
        }
    }
    text
}

/// Unsigned integer with optional `2#`, `8#` or `16#` radix prefix.
fn parse_unsigned(text: &str) -> Option<u64> {
    let cleaned = text.replace('_', "");
    let (radix, digits) = match cleaned.split_once('#') {
        Some(("2", digits)) => (2, digits.to_string()),
        Some(("8", digits)) => (8, digits.to_string()),
        Some(("16", digits)) => (16, digits.to_string()),
        Some(_) => return None,
        None => (10, cleaned),
    };
    u64::from_str_radix(&digits, radix).ok()
}

fn parse_signed(text: &str) -> Option<i64> {
    match text.strip_prefix('-') {
        Some(rest) => {
            let magnitude = parse_unsigned(rest)?;
            0i64.checked_sub_unsigned(magnitude)
        }
        None => parse_unsigned(text.strip_prefix('+').unwrap_or(text))
            .and_then(|v| i64::try_from(v).ok()),
    }
}

/// Typed access to a [`Value`] slot from Rust scalar types.
///
/// Several kinds share one Rust representation (BYTE and USINT are both
/// `u8`). Writing through this trait keeps the slot's declared kind.
pub trait PortValue: Sized {
    /// Kind reported when the conversion fails.
    const KIND: ValueKind;

    /// Extract `Self` from `value`, or `None` if the kind does not match.
    fn read(value: &Value) -> Option<Self>;

    /// Store `self` into `slot`; returns false if the slot's kind does not
    /// match or the value does not fit.
    fn write(self, slot: &mut Value) -> bool;

    /// Reject a value that no slot of its kind can hold.
    ///
    /// # Errors
    ///
    /// Returns the reason the value does not fit.
    fn check(&self) -> FbResult<()> {
        Ok(())
    }
}

macro_rules! port_value {
    ($ty:ty, $canonical:ident, $($variant:ident)|+) => {
        impl PortValue for $ty {
            const KIND: ValueKind = ValueKind::$canonical;

            fn read(value: &Value) -> Option<Self> {
                match value {
                    $(Value::$variant(v))|+ => Some(*v),
                    _ => None,
                }
            }

            fn write(self, slot: &mut Value) -> bool {
                match slot {
                    $(Value::$variant(v))|+ => {
                        *v = self;
                        true
                    }
                    _ => false,
                }
            }
        }
    };
}

port_value!(bool, Bool, Bool);
port_value!(u8, Byte, Byte | USInt);
port_value!(u16, Word, Word | UInt);
port_value!(u32, DWord, DWord | UDInt);
port_value!(u64, LWord, LWord | ULInt);
port_value!(i8, SInt, SInt);
port_value!(i16, Int, Int);
port_value!(i32, DInt, DInt);
port_value!(i64, LInt, LInt | Time);
port_value!(f32, Real, Real);
port_value!(f64, LReal, LReal);

impl PortValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn read(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn write(self, slot: &mut Value) -> bool {
        match slot {
            Value::String(s) if self.len() <= STRING_MAX_LEN => {
                *s = self;
                true
            }
            _ => false,
        }
    }

    fn check(&self) -> FbResult<()> {
        check_string_len(self)
    }
}
