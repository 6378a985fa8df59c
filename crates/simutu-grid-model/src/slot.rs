// SPDX-License-Identifier: Apache-2.0

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Size of the physical column pool. Bounds the number of logical fields
/// one checklist item can map; the generic row table carries exactly this
/// many untyped text columns.
pub const SLOT_POOL_SIZE: usize = 30;

/// One physical column slot, `c1`..`c30`. 1-based to match the generic
/// column names in the row table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(u8);

impl Slot {
    pub fn new(number: u8) -> Result<Self, GridError> {
        if number == 0 || number as usize > SLOT_POOL_SIZE {
            return Err(GridError::validation(
                "slot",
                format!("slot number must be within 1..={SLOT_POOL_SIZE}, got {number}"),
            ));
        }
        Ok(Self(number))
    }

    /// Parses the `"cN"` rendering used in storage and on the wire.
    pub fn parse(input: &str) -> Result<Self, GridError> {
        let digits = input.strip_prefix('c').ok_or_else(|| {
            GridError::validation("slot", format!("slot must look like c1..c{SLOT_POOL_SIZE}, got '{input}'"))
        })?;
        let number: u8 = digits.parse().map_err(|_| {
            GridError::validation("slot", format!("slot must look like c1..c{SLOT_POOL_SIZE}, got '{input}'"))
        })?;
        Self::new(number)
    }

    /// 1-based slot number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// 0-based index into a [`SlotArray`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Physical column name in the row table (`c1`..`c30`).
    #[must_use]
    pub fn column_name(self) -> String {
        format!("c{}", self.0)
    }

    /// All slots of the pool in ascending order.
    pub fn pool() -> impl Iterator<Item = Slot> {
        (1..=SLOT_POOL_SIZE as u8).map(Slot)
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl TryFrom<String> for Slot {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slot> for String {
    fn from(value: Slot) -> Self {
        value.column_name()
    }
}

/// Physical storage of one row: a fixed array of optional text values,
/// indexed by [`Slot`]. Untyped by design; logical access round-trips
/// through the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArray([Option<String>; SLOT_POOL_SIZE]);

impl SlotArray {
    #[must_use]
    pub fn new() -> Self {
        Self(std::array::from_fn(|_| None))
    }

    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.0[slot.index()].as_deref()
    }

    pub fn set(&mut self, slot: Slot, value: Option<String>) {
        self.0[slot.index()] = value;
    }

    /// True when every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Occupied slots in ascending slot order.
    pub fn entries(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_deref().map(|s| (Slot(i as u8 + 1), s)))
    }
}

impl Default for SlotArray {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_parse_accepts_pool_and_rejects_outside() {
        assert_eq!(Slot::parse("c1").expect("c1").number(), 1);
        assert_eq!(Slot::parse("c30").expect("c30").number(), 30);
        assert!(Slot::parse("c0").is_err());
        assert!(Slot::parse("c31").is_err());
        assert!(Slot::parse("d5").is_err());
        assert!(Slot::parse("c").is_err());
    }

    #[test]
    fn slot_renders_column_name() {
        let slot = Slot::new(7).expect("slot");
        assert_eq!(slot.to_string(), "c7");
        assert_eq!(slot.column_name(), "c7");
        assert_eq!(slot.index(), 6);
    }

    #[test]
    fn slot_array_round_trips_values() {
        let mut slots = SlotArray::new();
        assert!(slots.is_empty());

        let s3 = Slot::new(3).expect("slot");
        slots.set(s3, Some("abc".to_string()));
        assert_eq!(slots.get(s3), Some("abc"));
        assert_eq!(slots.entries().count(), 1);

        slots.set(s3, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn pool_covers_every_slot_once() {
        let pool: Vec<Slot> = Slot::pool().collect();
        assert_eq!(pool.len(), SLOT_POOL_SIZE);
        assert_eq!(pool.first().copied().map(Slot::number), Some(1));
        assert_eq!(pool.last().copied().map(Slot::number), Some(30));
    }
}
