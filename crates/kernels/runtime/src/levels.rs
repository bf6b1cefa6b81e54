//! Level evaluation
//!
//! Members of one Level read the store as it was before the Level started and
//! never each other's outputs, so they may run concurrently. Member `i`
//! receives `rng.for_member(i)`; the returned streams are folded back in
//! member order. Results come back in member order as well, so sequential and
//! parallel evaluation are indistinguishable to the caller.

use rayon::prelude::*;
use tracing::trace;

use rddl_foundation::RngStream;

use crate::compiled::{CompiledFn, Evaluation};
use crate::config::LevelParallelConfig;
use crate::store::Store;

/// A Level with its CPFs looked up.
pub(crate) struct ResolvedLevel {
    pub members: Vec<(String, CompiledFn)>,
}

/// Evaluate every member of `level` against `store`.
///
/// Returns one evaluation per member, in member order, and the engine stream
/// to continue with.
pub(crate) fn evaluate_level(
    level: &ResolvedLevel,
    store: &Store,
    rng: RngStream,
    config: &LevelParallelConfig,
) -> (Vec<Evaluation>, RngStream) {
    let run = |(i, (_, cpf)): (usize, &(String, CompiledFn))| cpf(store, rng.for_member(i as u64));

    let results: Vec<Evaluation> = if config.use_parallel(level.members.len()) {
        trace!(members = level.members.len(), "parallel level");
        level.members.par_iter().enumerate().map(run).collect()
    } else {
        level.members.iter().enumerate().map(run).collect()
    };
    let next = rng.fold(results.iter().map(|e| e.rng));
    (results, next)
}
