//! Fixed six-slot buffer of operator-entered code digits.

use otp_shared::validation::validators::is_single_digit;
use serde::{Deserialize, Serialize};

/// Length of the verification code
pub const CODE_LENGTH: usize = 6;

/// The digit slots of a one-time code
///
/// Every slot is either empty or holds one ASCII decimal digit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDigits {
    slots: [Option<char>; CODE_LENGTH],
}

impl CodeDigits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digit at `index`, `None` when empty or out of range
    pub fn get(&self, index: usize) -> Option<char> {
        self.slots.get(index).copied().flatten()
    }

    pub fn is_empty_at(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    /// Set or clear one slot
    ///
    /// `value` must be empty (clears the slot) or a single decimal digit.
    /// Returns `false` and leaves the slots untouched otherwise.
    pub fn set(&mut self, index: usize, value: &str) -> bool {
        if index >= CODE_LENGTH {
            return false;
        }
        if value.is_empty() {
            self.slots[index] = None;
            return true;
        }
        if !is_single_digit(value) {
            return false;
        }
        self.slots[index] = value.chars().next();
        true
    }

    pub fn clear(&mut self) {
        self.slots = [None; CODE_LENGTH];
    }

    /// Distribute pasted text over the slots
    ///
    /// Only the first six characters are considered. When every one of them is a
    /// decimal digit they fill the slots left to right and the remaining slots are
    /// emptied; the number of digits placed is returned. An empty paste therefore
    /// empties every slot and returns `Some(0)`. A non-digit among the taken
    /// characters leaves the slots untouched and returns `None`.
    pub fn fill_from_paste(&mut self, text: &str) -> Option<usize> {
        let taken: Vec<char> = text.chars().take(CODE_LENGTH).collect();
        if !taken.iter().all(|c| c.is_ascii_digit()) {
            return None;
        }

        self.clear();
        for (slot, digit) in self.slots.iter_mut().zip(taken.iter()) {
            *slot = Some(*digit);
        }
        Some(taken.len())
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled() == CODE_LENGTH
    }

    pub fn is_blank(&self) -> bool {
        self.filled() == 0
    }

    /// The joined code once every slot is filled
    pub fn code(&self) -> Option<String> {
        if self.is_complete() {
            Some(self.slots.iter().flatten().collect())
        } else {
            None
        }
    }

    /// Slot contents as strings, empty string for an empty slot
    pub fn as_strings(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| slot.map(String::from).unwrap_or_default())
            .collect()
    }
}
