use crate::errors::GraphError;
use crate::graph::GraphConfig;
use crate::store::ResultStore;

/// The computation graph a worker drives.
///
/// A graph holds one committed configuration and at most one pending
/// configuration. `update` may be called from the listener task at any time,
/// everything else is only ever called from the worker's main loop, so
/// implementations only need interior mutability that is safe for that split.
pub trait Graph: Send + Sync {
    /// Stage `config` as the pending configuration, replacing any earlier one.
    fn update(&self, config: GraphConfig);

    /// Promote pending to committed. On failure the committed configuration
    /// must be left untouched.
    fn configure(&self) -> Result<(), GraphError>;

    /// Restore the last known-good committed configuration after a failed
    /// `configure`. Fails with [`GraphError::NoCommittedConfig`] when there is
    /// nothing to go back to.
    fn revert(&self) -> Result<(), GraphError>;

    /// Run the committed configuration for the datagrams named in `updated`,
    /// reading inputs from and writing outputs to `store`.
    fn execute(&self, store: &mut ResultStore, updated: &[String]) -> Result<(), GraphError>;
}
