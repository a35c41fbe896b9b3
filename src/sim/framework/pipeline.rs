use std::time::{Duration, Instant};

use tracing::debug_span;

use super::{AbortHandle, ModuleId, ModuleReport, RunState, SimModule};
use crate::error::{Phase, RunError};

struct Instance {
    index: usize,
    id: ModuleId,
    module: Box<dyn SimModule>,
    elapsed: Duration,
}

/// Executes a sequence of constructed module instances.
///
/// Every phase walks the instances in order and stops at the first failure.
#[derive(Default)]
pub struct Pipeline {
    instances: Vec<Instance>,
    abort: Option<AbortHandle>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Appends an instance built from the module entry at `index`.
    pub fn push(&mut self, index: usize, id: ModuleId, module: Box<dyn SimModule>) {
        self.instances.push(Instance {
            index,
            id,
            module,
            elapsed: Duration::ZERO,
        });
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn init(&mut self, state: &mut RunState) -> Result<(), RunError> {
        self.run_phase(state, Phase::Init)
    }

    pub fn step(&mut self, state: &mut RunState, event: u64) -> Result<(), RunError> {
        self.run_phase(state, Phase::Event(event))
    }

    pub fn finalize(&mut self, state: &mut RunState) -> Result<(), RunError> {
        self.run_phase(state, Phase::Finalize)
    }

    fn run_phase(&mut self, state: &mut RunState, phase: Phase) -> Result<(), RunError> {
        for instance in self.instances.iter_mut() {
            if self.abort.as_ref().is_some_and(|a| a.is_aborted()) {
                return Err(RunError::Aborted {
                    index: instance.index,
                    id: instance.id.clone(),
                    phase,
                });
            }

            let span = debug_span!("module", id = %instance.id, %phase);
            let _enter = span.enter();

            let (ctx, bus) = state.split(phase.event());
            let started = Instant::now();
            let result = match phase {
                Phase::Init => instance.module.init(&ctx, bus),
                Phase::Event(_) => instance.module.step(&ctx, bus),
                Phase::Finalize => instance.module.finalize(&ctx, bus),
            };
            instance.elapsed += started.elapsed();

            result.map_err(|source| RunError::Module {
                index: instance.index,
                id: instance.id.clone(),
                phase,
                source,
            })?;
        }
        Ok(())
    }

    /// Per-instance timing, in execution order.
    pub fn reports(&self) -> Vec<ModuleReport> {
        self.instances
            .iter()
            .map(|i| ModuleReport {
                index: i.index,
                id: i.id.clone(),
                elapsed_s: i.elapsed.as_secs_f64(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigEntry;
    use crate::sim::framework::{Bus, DetectorTable, SimContext};
    use anyhow::Result;

    struct Counter;
    impl SimModule for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
            bus.put(ctx.event.unwrap_or(0));
            *bus.get_or_default::<u32>().unwrap() += 1;
            Ok(())
        }
    }

    fn state() -> RunState {
        RunState::new(ConfigEntry::new("Allpix"), DetectorTable::default(), 42)
    }

    #[test]
    fn test_step_runs_every_instance() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        pipeline.push(0, ModuleId::unique("A"), Box::new(Counter));
        pipeline.push(1, ModuleId::unique("B"), Box::new(Counter));
        assert_eq!(pipeline.len(), 2);
        let mut state = state();

        pipeline.init(&mut state).unwrap();
        pipeline.step(&mut state, 1).unwrap();
        pipeline.step(&mut state, 2).unwrap();
        pipeline.finalize(&mut state).unwrap();

        assert_eq!(state.bus().get::<u32>(), Some(&4));
        assert_eq!(state.bus().get::<u64>(), Some(&2));
        let reports = pipeline.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].id, ModuleId::unique("B"));
    }

    #[test]
    fn test_abort_stops_before_next_instance() {
        let abort = AbortHandle::new();
        let mut pipeline = Pipeline::new().with_abort(abort.clone());
        pipeline.push(0, ModuleId::unique("A"), Box::new(Counter));
        let mut state = state();
        abort.abort();

        match pipeline.step(&mut state, 1) {
            Err(RunError::Aborted { index, phase, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(phase, Phase::Event(1));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(state.bus().get::<u32>().is_none());
    }
}
