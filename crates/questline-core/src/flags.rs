//! World flags read by TriggerFlags objectives.
//!
//! Flag state is ambient: it is owned by game code, not by the quest
//! manager, and is not part of the quest save blob. The manager only asks a
//! [`FlagSource`] whether a flag is currently raised.

use std::cell::RefCell;
use std::collections::BTreeSet;

/// Synchronous predicate over world flags.
pub trait FlagSource {
    fn is_raised(&self, flag_id: &str) -> bool;
}

impl<T: FlagSource + ?Sized> FlagSource for &T {
    fn is_raised(&self, flag_id: &str) -> bool {
        (**self).is_raised(flag_id)
    }
}

impl<T: FlagSource> FlagSource for RefCell<T> {
    fn is_raised(&self, flag_id: &str) -> bool {
        self.borrow().is_raised(flag_id)
    }
}

/// A source where no flag is ever raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFlags;

impl FlagSource for NoFlags {
    fn is_raised(&self, _flag_id: &str) -> bool {
        false
    }
}

/// A plain set of raised flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    raised: BTreeSet<String>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a flag. Returns `true` if it was not already raised.
    pub fn raise(&mut self, flag_id: &str) -> bool {
        self.raised.insert(flag_id.to_string())
    }

    /// Lower a flag. Returns `true` if it was raised.
    pub fn lower(&mut self, flag_id: &str) -> bool {
        self.raised.remove(flag_id)
    }

    pub fn len(&self) -> usize {
        self.raised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.raised.iter().map(String::as_str)
    }
}

impl FlagSource for FlagSet {
    fn is_raised(&self, flag_id: &str) -> bool {
        self.raised.contains(flag_id)
    }
}

impl<S: AsRef<str>> FromIterator<S> for FlagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            raised: iter.into_iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_and_lower() {
        let mut flags = FlagSet::new();
        assert!(flags.raise("door"));
        assert!(!flags.raise("door"));
        assert!(flags.is_raised("door"));
        assert!(flags.lower("door"));
        assert!(!flags.is_raised("door"));
    }

    #[test]
    fn refcell_source_sees_later_raises() {
        let flags = RefCell::new(FlagSet::new());
        assert!(!flags.is_raised("lever"));
        flags.borrow_mut().raise("lever");
        assert!(flags.is_raised("lever"));
    }

    #[test]
    fn collect_from_strs() {
        let flags: FlagSet = ["a", "b"].into_iter().collect();
        assert_eq!(flags.len(), 2);
        assert!(flags.is_raised("b"));
        assert!(!NoFlags.is_raised("b"));
    }
}
