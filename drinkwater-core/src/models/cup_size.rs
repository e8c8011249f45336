use serde::{Deserialize, Serialize};
use std::fmt;

/// Volume added to progress by a single drink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CupSize(u32);

impl CupSize {
    /// Selected cup before the user picks one.
    pub const DEFAULT: CupSize = CupSize(300);
    pub const GLASS: CupSize = CupSize(200);
    pub const MUG: CupSize = CupSize(350);
    pub const BOTTLE: CupSize = CupSize(500);

    /// Returns `None` for a zero-sized cup.
    pub fn new(ml: u32) -> Option<Self> {
        (ml > 0).then_some(Self(ml))
    }

    pub fn ml(self) -> u32 {
        self.0
    }
}

impl Default for CupSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ml", self.0)
    }
}
