pub mod appointment;
pub mod employee;
pub mod enums;
pub mod patient;
pub mod role;
pub mod room;

pub use appointment::*;
pub use employee::*;
pub use enums::*;
pub use patient::*;
pub use role::*;
pub use room::*;

use std::collections::BTreeMap;

use crate::query::Value;

/// A row read by column name, used for joined projections that have no
/// dedicated struct.
pub type Record = BTreeMap<String, Value>;
