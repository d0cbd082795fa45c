//! Dirty-flag helpers for recomputing derived state only on change.

/// A flag raised by writers and consumed once by a reader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyFlag(bool);

impl DirtyFlag {
    /// A flag that starts raised, so the first reader recomputes.
    pub fn dirty() -> Self {
        Self(true)
    }

    /// Raise the flag.
    pub fn mark(&mut self) {
        self.0 = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.0
    }

    /// Returns whether the flag was raised and lowers it.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }
}

/// Caches a value derived from a key and recomputes it only when the key changes.
#[derive(Clone, Debug)]
pub struct Memo<K, V> {
    entry: Option<(K, V)>,
    recomputes: u64,
}

impl<K: PartialEq, V> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            entry: None,
            recomputes: 0,
        }
    }

    /// Return the value for `key`, calling `compute` only if `key` differs
    /// from the last one seen.
    pub fn get_or_update(&mut self, key: K, compute: impl FnOnce(&K) -> V) -> &V {
        if !matches!(&self.entry, Some((cached, _)) if *cached == key) {
            self.entry = None;
        }
        let recomputes = &mut self.recomputes;
        let (_, value) = self.entry.get_or_insert_with(|| {
            *recomputes += 1;
            let value = compute(&key);
            (key, value)
        });
        value
    }

    /// Drop the cached value so the next lookup recomputes.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// How many times the value has been computed.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }
}

impl<K: PartialEq, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_flag_take_lowers() {
        let mut flag = DirtyFlag::default();
        assert!(!flag.take());
        flag.mark();
        assert!(flag.is_dirty());
        assert!(flag.take());
        assert!(!flag.is_dirty());
        assert!(DirtyFlag::dirty().take());
    }

    #[test]
    fn test_memo_recomputes_only_on_key_change() {
        let mut memo: Memo<u32, u32> = Memo::new();
        assert_eq!(*memo.get_or_update(2, |k| k * 10), 20);
        assert_eq!(*memo.get_or_update(2, |_| unreachable!()), 20);
        assert_eq!(*memo.get_or_update(3, |k| k * 10), 30);
        assert_eq!(memo.recomputes(), 2);
    }

    #[test]
    fn test_memo_borrow_outlives_lookup() {
        let mut memo: Memo<(i32, i32), String> = Memo::new();
        let first = memo.get_or_update((1, 2), |k| format!("{}x{}", k.0, k.1)).clone();
        let again = memo.get_or_update((1, 2), |_| String::from("stale"));
        assert_eq!(*again, first);
        let next = memo.get_or_update((2, 2), |k| format!("{}x{}", k.0, k.1));
        assert_eq!(next, "2x2");
        assert_eq!(memo.recomputes(), 2);
    }

    #[test]
    fn test_memo_invalidate() {
        let mut memo: Memo<&str, usize> = Memo::default();
        memo.get_or_update("abc", |k| k.len());
        memo.invalidate();
        assert_eq!(*memo.get_or_update("abc", |_| 7), 7);
    }
}
