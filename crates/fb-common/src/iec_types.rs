#![allow(non_camel_case_types)]

//! Rust representations of the IEC 61131-3 elementary types carried in
//! block buffers, plus the index types used to address ports and events.

// ANY_BIT
pub type BOOL = bool;
pub type BYTE = u8;
pub type WORD = u16;
pub type DWORD = u32;
pub type LWORD = u64;

// ANY_INT, signed then unsigned
pub type SINT = i8;
pub type INT = i16;
pub type DINT = i32;
pub type LINT = i64;
pub type USINT = u8;
pub type UINT = u16;
pub type UDINT = u32;
pub type ULINT = u64;

// ANY_REAL
pub type REAL = f32;
pub type LREAL = f64;

/// Duration in signed nanoseconds.
pub type TIME = i64;

/// Single-byte character string; storage is bounded by the slot size.
pub type STRING = String;

/// Position of a data input or output inside one interface.
pub type PortId = usize;

/// Position of an event input or event output inside one interface.
pub type EventId = usize;
