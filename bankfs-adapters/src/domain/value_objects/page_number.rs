//! Physical page number within a flash bank.

use core::fmt;

/// A physical flash page, counted from the start of its bank.
///
/// This is the value the flash controller's page-select field expects, not
/// the block index a filesystem sees. Page numbers only mean something
/// relative to a bank of known size; [`PageNumber::checked`] and
/// [`PageNumber::is_within`] tie a page to that bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PageNumber(u32);

impl PageNumber {
    /// Wrap a raw page number without checking it against any bank.
    ///
    /// # Examples
    ///
    /// ```
    /// use bankfs_adapters::PageNumber;
    ///
    /// let page = PageNumber::new(0);
    /// assert_eq!(page.value(), 0);
    /// ```
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Page `value` of a bank holding `pages_per_bank` pages.
    ///
    /// Returns `None` when the page does not exist in such a bank.
    ///
    /// ```
    /// use bankfs_adapters::PageNumber;
    ///
    /// assert_eq!(PageNumber::checked(255, 256), Some(PageNumber::new(255)));
    /// assert_eq!(PageNumber::checked(256, 256), None);
    /// ```
    #[inline]
    pub const fn checked(value: u32, pages_per_bank: u32) -> Option<Self> {
        if value < pages_per_bank {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Page number as the controller sees it.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether the page exists in a bank of `pages_per_bank` pages.
    #[inline]
    pub const fn is_within(self, pages_per_bank: u32) -> bool {
        self.0 < pages_per_bank
    }

    /// The page `count` pages further on, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, count: u32) -> Option<Self> {
        match self.0.checked_add(count) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}
