#![doc = "Common types shared across the function block runtime workspace."]

pub mod config;
pub mod error;
pub mod iec_types;
pub mod state;
pub mod string_dict;
pub mod value;

pub use config::*;
pub use error::*;
pub use iec_types::*;
pub use state::*;
pub use string_dict::*;
pub use value::*;
