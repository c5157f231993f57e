use crate::types::Operation;

/// The only path through which the engine touches user files.
///
/// The default forwards to `fs::ops::execute`; hosts can route through a
/// platform trash or a remote agent instead.
pub trait Mutator: Send + Sync {
    /// Perform one operation. Preconditions were already checked.
    /// # Errors
    /// Any IO error; the engine records it against the operation and stops.
    fn apply(&self, op: &Operation) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdMutator;

impl Mutator for StdMutator {
    fn apply(&self, op: &Operation) -> std::io::Result<()> {
        crate::fs::ops::execute(op)
    }
}
