use std::time::Instant;

use tracing::{debug, info, info_span};

use super::{
    AbortHandle, DetectorTable, ModuleRegistry, ModuleSetup, Pipeline, RunState, RunSummary,
};
use crate::config::manager::{DEFAULT_NUMBER_OF_EVENTS, DEFAULT_RANDOM_SEED};
use crate::config::{ConfigError, ConfigManager, PlannedInstance};
use crate::error::RunError;

/// Runs a configuration against a module registry.
///
/// A run validates the configuration, constructs every module instance in
/// sequence order, then calls `init` on all of them, `step` once per event
/// and finally `finalize`. The first failure ends the run.
pub struct PipelineExecutor {
    registry: ModuleRegistry,
    abort: Option<AbortHandle>,
}

impl PipelineExecutor {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            abort: None,
        }
    }

    /// Lets the caller stop the run between two module steps.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn run(&self, manager: ConfigManager) -> Result<RunSummary, RunError> {
        let started = Instant::now();

        let planned = manager.plan(&self.registry)?;
        let global = manager
            .global_config()
            .cloned()
            .ok_or(ConfigError::MissingGlobal)?;
        let events = global
            .count_or("number_of_events", DEFAULT_NUMBER_OF_EVENTS)
            .map_err(ConfigError::from)?;
        let seed = global
            .count_or("random_seed", DEFAULT_RANDOM_SEED)
            .map_err(ConfigError::from)?;
        let detectors =
            DetectorTable::from_configs(manager.detectors()).map_err(ConfigError::from)?;

        let mut state = RunState::new(global, detectors, seed);
        let span = info_span!("run", id = %state.run_id().short());
        let _enter = span.enter();
        info!(
            run_id = %state.run_id(),
            events,
            seed,
            instances = planned.len(),
            "starting run"
        );

        let mut pipeline = self.construct(&manager, &planned, &mut state)?;

        pipeline.init(&mut state)?;
        for event in 1..=events {
            debug!(event, "processing event");
            pipeline.step(&mut state, event)?;
        }
        pipeline.finalize(&mut state)?;

        let summary = RunSummary {
            run_id: state.run_id().to_string(),
            events,
            modules: pipeline.reports(),
            failed: 0,
            elapsed_s: started.elapsed().as_secs_f64(),
        };
        info!(
            run_id = %summary.run_id,
            executed = summary.executed(),
            failed = summary.failed,
            elapsed_s = summary.elapsed_s,
            "run finished"
        );
        Ok(summary)
    }

    fn construct(
        &self,
        manager: &ConfigManager,
        planned: &[PlannedInstance],
        state: &mut RunState,
    ) -> Result<Pipeline, RunError> {
        let mut pipeline = match &self.abort {
            Some(abort) => Pipeline::new().with_abort(abort.clone()),
            None => Pipeline::new(),
        };

        for instance in planned {
            let descriptor = self
                .registry
                .resolve(&instance.id.name)
                .map_err(|source| ConfigError::UnknownModule {
                    index: instance.index,
                    source,
                })?;
            let seed = state.next_seed();
            let setup = ModuleSetup {
                id: &instance.id,
                config: &manager.modules()[instance.index],
                global: state.global(),
                detector: instance
                    .id
                    .detector
                    .as_deref()
                    .and_then(|d| state.detectors().get(d)),
                seed,
            };
            let module = descriptor
                .create(&setup)
                .map_err(|source| RunError::Construction {
                    index: instance.index,
                    id: instance.id.clone(),
                    source,
                })?;
            debug!(id = %instance.id, module = module.name(), "constructed");
            pipeline.push(instance.index, instance.id.clone(), module);
        }
        debug!(instances = pipeline.len(), "constructed pipeline");
        Ok(pipeline)
    }
}
