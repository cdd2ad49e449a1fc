//! Recording of public op calls.
//!
//! Every public entry point goes through [`recorded`], which logs the op name and the
//! shapes of the supplied operands on the engine's tape (if it has one) before running
//! the op body.

use std::sync::{Mutex, PoisonError};

use normkit_tensor::Tensor;

use crate::{engine::Engine, operand::Operand};

/// One recorded op call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeEntry {
    /// Name of the public op.
    pub op: &'static str,
    /// Shapes of the supplied operands, in argument order. Absent operands are omitted.
    pub inputs: Vec<(Operand, Vec<usize>)>,
}

/// A sink for recorded op calls.
pub trait Tape: Send + Sync {
    /// Appends an entry.
    fn record(&self, entry: TapeEntry);
}

/// An in-memory tape.
#[derive(Debug, Default)]
pub struct OpTape {
    entries: Mutex<Vec<TapeEntry>>,
}

impl OpTape {
    /// Creates an empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded entries, oldest first.
    pub fn entries(&self) -> Vec<TapeEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all recorded entries.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Tape for OpTape {
    fn record(&self, entry: TapeEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

/// Records `op` on the engine's tape, then runs `body`.
///
/// # Arguments
///
/// * `engine` - The engine whose tape receives the entry.
/// * `op` - The public op name.
/// * `inputs` - The operands of the call; absent ones are skipped.
/// * `body` - The op implementation.
pub fn recorded<T, E, R, F>(
    engine: &E,
    op: &'static str,
    inputs: &[(Operand, Option<&Tensor<T>>)],
    body: F,
) -> R
where
    E: Engine<T> + ?Sized,
    F: FnOnce() -> R,
{
    if let Some(tape) = engine.tape() {
        let entry = TapeEntry {
            op,
            inputs: inputs
                .iter()
                .filter_map(|(operand, tensor)| tensor.map(|t| (*operand, t.shape().to_vec())))
                .collect(),
        };
        log::trace!("recording {:?}", entry);
        tape.record(entry);
    }
    body()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use normkit_tensor::Tensor;

    use super::{recorded, OpTape, TapeEntry};
    use crate::{cpu::CpuEngine, operand::Operand};

    #[test]
    fn test_recorded_skips_absent_operands() {
        let tape = Arc::new(OpTape::new());
        let engine = CpuEngine::new().with_tape(tape.clone());
        let x = Tensor::<f32>::zeros(&[2, 3]).unwrap();

        let out = recorded(
            &engine,
            "identity",
            &[(Operand::X, Some(&x)), (Operand::Scale, None)],
            || 42,
        );

        assert_eq!(out, 42);
        assert_eq!(
            tape.entries(),
            vec![TapeEntry {
                op: "identity",
                inputs: vec![(Operand::X, vec![2, 3])],
            }]
        );

        tape.clear();
        assert!(tape.is_empty());
    }

    #[test]
    fn test_recorded_without_tape() {
        let engine = CpuEngine::new();
        let x = Tensor::<f32>::zeros(&[1]).unwrap();
        let out = recorded(&engine, "identity", &[(Operand::X, Some(&x))], || "ran");
        assert_eq!(out, "ran");
    }
}
