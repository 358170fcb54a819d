//! Flash bank selector.

/// Physical flash bank holding a storage region.
///
/// Dual-bank parts select the bank of a page erase separately from the page
/// number, so the bank travels with every erase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// First bank, usually shared with code and vector tables.
    Bank1,
    /// Second bank, dedicated to storage.
    Bank2,
}

impl Bank {
    /// Zero-based bank index.
    #[inline]
    pub const fn index(self) -> u8 {
        match self {
            Bank::Bank1 => 0,
            Bank::Bank2 => 1,
        }
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::Bank2
    }
}
