/// Z-ordering key for draw items.
///
/// Higher values appear on top of lower values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct ZIndex(pub i32);

impl ZIndex {
    #[inline]
    pub const fn new(v: i32) -> Self {
        Self(v)
    }
}

/// Stable sort key for draw items.
///
/// Derived ordering is lexicographic over the fields: `z` ascending
/// (back-to-front), then `order` ascending (insertion order within a layer).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SortKey {
    pub z: ZIndex,
    pub order: u32,
}

impl SortKey {
    #[inline]
    pub const fn new(z: ZIndex, order: u32) -> Self {
        Self { z, order }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_dominates_insertion_order() {
        let back = SortKey::new(ZIndex(0), 10);
        let front = SortKey::new(ZIndex(1), 0);
        assert!(back < front);
    }

    #[test]
    fn insertion_order_breaks_ties() {
        assert!(SortKey::new(ZIndex(3), 1) < SortKey::new(ZIndex(3), 2));
    }
}
