//!
//! [`Scenario`]: the triple of actor lists one [`crate::runner::ScenarioRunner`] invocation is
//! compiled from (spec.md §3 `Scenario`).

use lincheck_actor::actor::Actor;

/// One scenario: a single-threaded init phase, `n_threads` parallel actor lists, a
/// single-threaded post phase, and an optional validation actor run after POST.
///
/// `T` is the test subject's type; `V`/`K` are this scenario's value/exception-kind types,
/// matching [`lincheck_actor::outcome::Outcome`].
pub struct Scenario<T, V, K> {
    init: Vec<Actor<T, V, K>>,
    parallel: Vec<Vec<Actor<T, V, K>>>,
    post: Vec<Actor<T, V, K>>,
    validation: Option<Actor<T, V, K>>,
}

impl<T, V, K> Scenario<T, V, K> {
    /// Builds a scenario from its init, parallel, and post actor lists. `parallel` must be
    /// non-empty: a scenario with no parallel threads has nothing to race.
    pub fn new(init: Vec<Actor<T, V, K>>, parallel: Vec<Vec<Actor<T, V, K>>>, post: Vec<Actor<T, V, K>>) -> Self {
        assert!(!parallel.is_empty(), "a scenario needs at least one parallel thread");
        Self {
            init,
            parallel,
            post,
            validation: None,
        }
    }

    /// Attaches a validation actor, run on its own thread index after POST completes.
    pub fn with_validation(mut self, validation: Actor<T, V, K>) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Number of parallel threads this scenario races.
    pub fn n_threads(&self) -> usize {
        self.parallel.len()
    }

    /// The init phase's actor list.
    pub fn init(&self) -> &[Actor<T, V, K>] {
        &self.init
    }

    /// The parallel phase's per-thread actor lists.
    pub fn parallel(&self) -> &[Vec<Actor<T, V, K>>] {
        &self.parallel
    }

    /// The post phase's actor list.
    pub fn post(&self) -> &[Actor<T, V, K>] {
        &self.post
    }

    /// The validation actor, if one was attached.
    pub fn validation(&self) -> Option<&Actor<T, V, K>> {
        self.validation.as_ref()
    }
}

impl<T, V, K> Clone for Scenario<T, V, K> {
    fn clone(&self) -> Self {
        Self {
            init: self.init.clone(),
            parallel: self.parallel.clone(),
            post: self.post.clone(),
            validation: self.validation.clone(),
        }
    }
}
