//! Entry-point call tree.
//!
//! Walks the static call graph from the probed entry function. Callees
//! that take no arguments and return nothing cannot carry kernel state
//! into or out of the probe, so the walk does not descend into them.

use flatgen_facts::{Function, Universe};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::GenError;

/// Ids of the entry function and everything reachable from it through
/// direct calls. The entry itself always stays, whatever its signature.
pub fn reachable_functions(universe: &Universe, entry: &str) -> Result<FxHashSet<u64>, GenError> {
    let root = universe.function_by_name(entry)?;
    let mut discovered = FxHashSet::default();
    discovered.insert(root.id);
    let mut stack = vec![root];
    while let Some(func) = stack.pop() {
        for &callee in &func.calls {
            if discovered.contains(&callee) {
                continue;
            }
            let Some(next) = universe.function_by_id(callee) else {
                continue;
            };
            if arity(universe, next) == 0 {
                continue;
            }
            discovered.insert(callee);
            stack.push(next);
        }
    }
    debug!(entry, functions = discovered.len(), "call tree collected");
    Ok(discovered)
}

/// Argument count plus one for a non-void return.
fn arity(universe: &Universe, func: &Function) -> u32 {
    let has_return = func.types.first().is_some_and(|&ret| {
        !universe.is_void(universe.walk_typedef_chain(ret))
    });
    func.nargs + u32::from(has_return)
}
