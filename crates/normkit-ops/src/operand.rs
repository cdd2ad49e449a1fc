/// The role a tensor plays in a batch normalization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// The primary input.
    X,
    /// Per-channel or per-element mean.
    Mean,
    /// Per-channel or per-element variance.
    Variance,
    /// Optional multiplicative factor.
    Scale,
    /// Optional additive term.
    Offset,
}

impl Operand {
    /// The statistics operands, in kernel argument order.
    pub const PARAMS: [Operand; 4] = [Self::Mean, Self::Variance, Self::Scale, Self::Offset];

    /// Returns the kernel input name of the operand.
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Mean => "mean",
            Self::Variance => "variance",
            Self::Scale => "scale",
            Self::Offset => "offset",
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
