//! Process-wide engine constructor for hosts that cannot pass one in.
//!
//! The Python `Projection` class is constructed from year bounds only, so the
//! extension needs to know which engine to instantiate. An embedding crate
//! registers its constructor once, typically from its own module initializer.
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::engine::Engine;

/// Builds an engine for `[first_year, final_year]`.
pub type EngineFactory = fn(first_year: i32, final_year: i32) -> Box<dyn Engine>;

static FACTORY: OnceLock<EngineFactory> = OnceLock::new();

/// Register the process-wide engine constructor.
///
/// Returns `false` (and keeps the existing constructor) if one was already
/// registered.
pub fn register_engine(factory: EngineFactory) -> bool {
    let accepted = FACTORY.set(factory).is_ok();
    if accepted {
        debug!("projection engine registered");
    } else {
        warn!("projection engine already registered; ignoring new registration");
    }
    accepted
}

/// The registered constructor, if any.
pub fn engine_factory() -> Option<EngineFactory> {
    FACTORY.get().copied()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::engine::{EngineResult, ParamTable, ParameterStore};
    use crate::projection::workspace::Workspace;

    struct Idle(ParamTable);

    impl Engine for Idle {
        fn parameters(&mut self) -> &mut dyn ParameterStore {
            &mut self.0
        }

        fn initialize(&mut self, _: &Path) -> EngineResult<()> {
            Ok(())
        }

        fn project_year(&mut self, _: usize, _: &mut Workspace<'_>) -> EngineResult<()> {
            Ok(())
        }
    }

    fn build_idle(_: i32, _: i32) -> Box<dyn Engine> {
        Box::new(Idle(ParamTable::new()))
    }

    fn build_other(_: i32, _: i32) -> Box<dyn Engine> {
        Box::new(Idle(ParamTable::new()))
    }

    #[test]
    // Purpose
    // -------
    // The first registration wins and later ones are refused.
    fn first_registration_wins() {
        let first = register_engine(build_idle);
        let second = register_engine(build_other);

        assert!(first);
        assert!(!second);
        assert!(engine_factory().is_some());
    }
}
