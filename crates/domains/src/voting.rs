//! Vote direction and the rating arithmetic of the vote ledger.

use crate::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Up,
    Down,
}

impl Voice {
    /// Parses the wire value of a vote: `1` or `-1`.
    pub fn from_rating(rating: i32) -> DomainResult<Self> {
        match rating {
            1 => Ok(Voice::Up),
            -1 => Ok(Voice::Down),
            other => Err(DomainError::Validation(format!(
                "voice must be 1 or -1, got {other}"
            ))),
        }
    }

    pub fn is_up(self) -> bool {
        matches!(self, Voice::Up)
    }

    pub fn from_up(up: bool) -> Self {
        if up {
            Voice::Up
        } else {
            Voice::Down
        }
    }

    pub fn signed(self) -> i64 {
        match self {
            Voice::Up => 1,
            Voice::Down => -1,
        }
    }

    /// Change to the thread rating when `self` is cast over `prior`.
    ///
    /// A first vote counts once, a repeated vote not at all, and a flipped vote
    /// twice so the running total moves by the full swing.
    pub fn delta_over(self, prior: Option<Voice>) -> i64 {
        match prior {
            None => self.signed(),
            Some(previous) if previous == self => 0,
            Some(_) => 2 * self.signed(),
        }
    }
}
