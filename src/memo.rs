/// Single-slot memo: keeps the last value and the key it was computed for.
#[derive(Debug)]
pub struct Memo<K, V> {
    slot: Option<(K, V)>,
    computations: usize,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            slot: None,
            computations: 0,
        }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    /// Value for `key`, recomputed only when `key` differs from the last one.
    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        if !matches!(&self.slot, Some((last, _)) if *last == key) {
            self.slot = None;
        }
        let computations = &mut self.computations;
        let (_, value) = self.slot.get_or_insert_with(|| {
            *computations += 1;
            (key, compute())
        });
        value
    }

    /// How many times the value has been computed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}
