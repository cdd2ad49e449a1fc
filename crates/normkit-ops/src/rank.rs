/// The rank classes the dispatcher canonicalizes differently.
///
/// Ranks 0 through 4 each get their own variant; anything above 4 is carried
/// as [`Rank::Higher`] and treated as already canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    /// A scalar.
    Zero,
    /// A vector.
    One,
    /// A matrix.
    Two,
    /// A rank-3 tensor.
    Three,
    /// A rank-4 tensor, the kernel's native rank.
    Four,
    /// Rank 5 or more.
    Higher(usize),
}

impl Rank {
    /// Returns the rank class of a tensor with `ndim` dimensions.
    ///
    /// # Example
    ///
    /// ```
    /// use normkit_ops::Rank;
    ///
    /// assert_eq!(Rank::of(2), Rank::Two);
    /// assert_eq!(Rank::of(6), Rank::Higher(6));
    /// assert_eq!(Rank::of(6).ndim(), 6);
    /// ```
    pub fn of(ndim: usize) -> Self {
        match ndim {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            n => Self::Higher(n),
        }
    }

    /// Returns the number of dimensions.
    pub fn ndim(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Higher(n) => n,
        }
    }
}

impl From<usize> for Rank {
    fn from(ndim: usize) -> Self {
        Self::of(ndim)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ndim())
    }
}
