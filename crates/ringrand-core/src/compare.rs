//! Element-wise buffer comparison.

/// First position where two buffers differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch<T> {
    /// Index of the differing element.
    pub index: usize,
    /// Value in the left buffer, `None` past its end.
    pub left: Option<T>,
    /// Value in the right buffer, `None` past its end.
    pub right: Option<T>,
}

impl<T: std::fmt::LowerHex> std::fmt::Display for Mismatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "index {}: ", self.index)?;
        match &self.left {
            Some(v) => write!(f, "{:#018x}", v)?,
            None => write!(f, "<missing>")?,
        }
        write!(f, " != ")?;
        match &self.right {
            Some(v) => write!(f, "{:#018x}", v),
            None => write!(f, "<missing>"),
        }
    }
}

/// Number of differing elements; a length difference counts once per
/// missing element.
pub fn count_mismatches<T: PartialEq>(left: &[T], right: &[T]) -> usize {
    let differing = left.iter().zip(right).filter(|(a, b)| a != b).count();
    differing + left.len().abs_diff(right.len())
}

/// The first differing element, if any.
pub fn first_mismatch<T: PartialEq + Copy>(left: &[T], right: &[T]) -> Option<Mismatch<T>> {
    let len = left.len().max(right.len());
    (0..len).find_map(|index| {
        let l = left.get(index).copied();
        let r = right.get(index).copied();
        (l != r).then_some(Mismatch {
            index,
            left: l,
            right: r,
        })
    })
}
