use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Option<i64>,
    /// Door number, e.g. `12` or `104B`.
    pub number: String,
    pub floor: i64,
    pub capacity: i64,
}

impl Room {
    pub fn new(number: impl Into<String>, floor: i64, capacity: i64) -> Self {
        Self {
            id: None,
            number: number.into(),
            floor,
            capacity,
        }
    }
}
