//! Argument materializer — folds resolved arguments into a command line.

use k2plan_core::Runnable;

/// Render `--key value` for every argument, in declaration order.
///
/// Placeholders the resolver deferred are emitted as their literal token.
pub fn materialize(runnable: &Runnable) -> String {
    runnable
        .args()
        .iter()
        .map(|arg| format!("--{} {}", arg.key, arg.value))
        .collect::<Vec<_>>()
        .join(" ")
}
