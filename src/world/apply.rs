//! Budget-limited incremental reconstruction.
//!
//! `ApplyScheduler` rebuilds a blueprint into a destination target a few
//! entities at a time so a large blueprint never stalls the simulation
//! frame. The host loop calls `step` once per tick until it reports `Done`
//! or `Abandoned`.
//!
//! State machine: `Idle -> Running { cursor, total } -> Completed | Abandoned`.
//! A run is abandoned when its target disappears from the registry or when
//! `cancel` is called; it is never paused.

use ahash::AHashSet;
use glam::{Quat, Vec3};

use super::host::{EntityHost, StagedMarker};
use super::targets::{ApplyLease, TargetHandle, TargetRegistry};
use super::ApplyError;
use crate::blueprints::{BlueprintObject, BlueprintRoot, EntityIdentifier};
use crate::core::math::euler_to_quat;
use crate::core::BlueprintConfig;

/// How an apply run behaves
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Entities processed per step before yielding (at least 1)
    pub entities_per_step: usize,
    /// Spawn inert placeholders instead of fully active instances
    pub staged: bool,
    /// Skip entities that land outside the target's volume
    pub constrain_to_target: bool,
    /// Kinds whose state blobs are re-applied
    pub stateful: AHashSet<EntityIdentifier>,
}

impl ApplyOptions {
    pub fn from_config(config: &BlueprintConfig) -> Self {
        Self {
            entities_per_step: config.entities_per_step.max(1),
            staged: config.staged_by_default,
            constrain_to_target: true,
            stateful: config.stateful_identifiers(),
        }
    }
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self::from_config(&BlueprintConfig::default())
    }
}

/// Where the scheduler is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    Idle,
    Running { cursor: usize, total: usize },
    Completed,
    Abandoned,
}

/// Result of one scheduling step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// `start` has not been called
    NotStarted,
    /// More entities remain; call again next tick
    Pending,
    /// Every entity has been processed
    Done,
    /// The run stopped before finishing
    Abandoned,
}

/// Counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub placed: usize,
    pub out_of_volume: usize,
    pub unresolved: usize,
    pub state_failures: usize,
    /// Steps that processed at least one entity
    pub yields: usize,
}

/// Incremental rebuild of one blueprint into one target
pub struct ApplyScheduler<I> {
    blueprint: BlueprintRoot,
    target: TargetHandle,
    position: Vec3,
    delta: Quat,
    options: ApplyOptions,
    state: ApplyState,
    report: ApplyReport,
    spawned: Vec<I>,
    lease: Option<ApplyLease>,
}

impl<I> ApplyScheduler<I> {
    /// Prepare a rebuild at a destination pose (rotation in Euler degrees)
    pub fn new(
        blueprint: BlueprintRoot,
        target: TargetHandle,
        position: Vec3,
        rotation: Vec3,
        mut options: ApplyOptions,
    ) -> Self {
        options.entities_per_step = options.entities_per_step.max(1);
        // Bring the capture frame onto the destination frame.
        let delta = euler_to_quat(rotation) * euler_to_quat(blueprint.box_rotation).inverse();
        Self {
            blueprint,
            target,
            position,
            delta,
            options,
            state: ApplyState::Idle,
            report: ApplyReport::default(),
            spawned: Vec::new(),
            lease: None,
        }
    }

    /// Claim the target and begin the run
    pub fn start(&mut self, registry: &TargetRegistry) -> Result<(), ApplyError> {
        if self.state != ApplyState::Idle {
            return Err(ApplyError::AlreadyStarted);
        }
        self.lease = Some(registry.lease(self.target)?);
        self.state = ApplyState::Running {
            cursor: 0,
            total: self.blueprint.objects.len(),
        };
        tracing::debug!(
            "Applying blueprint '{}' ({} entities, {} per step)",
            self.blueprint.name,
            self.blueprint.objects.len(),
            self.options.entities_per_step
        );
        Ok(())
    }

    /// Process up to `entities_per_step` entities
    pub fn step<H>(&mut self, host: &mut H, registry: &TargetRegistry) -> StepOutcome
    where
        H: EntityHost<Instance = I>,
    {
        let (mut cursor, total) = match self.state {
            ApplyState::Idle => return StepOutcome::NotStarted,
            ApplyState::Completed => return StepOutcome::Done,
            ApplyState::Abandoned => return StepOutcome::Abandoned,
            ApplyState::Running { cursor, total } => (cursor, total),
        };

        let Some(target) = registry.get(self.target) else {
            tracing::info!(
                "Target for blueprint '{}' is gone, abandoning at {}/{}",
                self.blueprint.name,
                cursor,
                total
            );
            self.finish(ApplyState::Abandoned);
            return StepOutcome::Abandoned;
        };

        let end = (cursor + self.options.entities_per_step).min(total);
        if end > cursor {
            self.report.yields += 1;
        }

        while cursor < end {
            let object = &self.blueprint.objects[cursor];
            let index = cursor;
            cursor += 1;

            let Some(template) = host.resolve(&object.id) else {
                tracing::warn!(
                    "No template for '{}' in blueprint '{}', skipping",
                    object.id,
                    self.blueprint.name
                );
                self.report.unresolved += 1;
                continue;
            };

            let (position, rotation) = world_pose(self.position, self.delta, object);
            if self.options.constrain_to_target && !target.is_within(position) {
                tracing::debug!("'{}' at {:?} is outside '{}'", object.id, position, target.name);
                self.report.out_of_volume += 1;
                continue;
            }

            let instance = host.spawn(&template, position, rotation);

            if let Some(state) = object
                .state
                .as_deref()
                .filter(|_| self.options.stateful.contains(&object.id))
            {
                if let Err(e) = host.apply_state(&instance, state) {
                    tracing::warn!("'{}' spawned without its state: {}", object.id, e);
                    self.report.state_failures += 1;
                }
            }

            if self.options.staged {
                host.make_staged(
                    &instance,
                    StagedMarker {
                        blueprint: self.blueprint.name.clone(),
                        index,
                    },
                );
            }

            self.report.placed += 1;
            self.spawned.push(instance);
        }

        if cursor >= total {
            tracing::info!(
                "Applied blueprint '{}': {} placed, {} outside volume, {} unresolved",
                self.blueprint.name,
                self.report.placed,
                self.report.out_of_volume,
                self.report.unresolved
            );
            self.finish(ApplyState::Completed);
            StepOutcome::Done
        } else {
            self.state = ApplyState::Running { cursor, total };
            StepOutcome::Pending
        }
    }

    /// Stop the run; already spawned instances stay in the world
    pub fn cancel(&mut self) {
        if matches!(self.state, ApplyState::Idle | ApplyState::Running { .. }) {
            self.finish(ApplyState::Abandoned);
        }
    }

    /// Step until the run ends, ignoring the frame budget
    pub fn run_to_end<H>(&mut self, host: &mut H, registry: &TargetRegistry) -> StepOutcome
    where
        H: EntityHost<Instance = I>,
    {
        loop {
            match self.step(host, registry) {
                StepOutcome::Pending => continue,
                outcome => return outcome,
            }
        }
    }

    /// Destroy everything this run spawned
    pub fn undo<H>(&mut self, host: &mut H)
    where
        H: EntityHost<Instance = I>,
    {
        for instance in self.spawned.drain(..) {
            host.destroy(instance);
        }
    }

    fn finish(&mut self, state: ApplyState) {
        self.state = state;
        self.lease = None;
    }

    pub fn state(&self) -> ApplyState {
        self.state
    }

    pub fn report(&self) -> ApplyReport {
        self.report
    }

    pub fn target(&self) -> TargetHandle {
        self.target
    }

    pub fn blueprint(&self) -> &BlueprintRoot {
        &self.blueprint
    }

    /// Instances spawned so far, in placement order
    pub fn spawned(&self) -> &[I] {
        &self.spawned
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ApplyState::Completed | ApplyState::Abandoned)
    }
}

/// World pose of an object for a destination position and frame delta
pub fn world_pose(position: Vec3, delta: Quat, object: &BlueprintObject) -> (Vec3, Quat) {
    (
        position + delta * object.relative_position,
        delta * euler_to_quat(object.relative_rotation),
    )
}

/// Drives every active apply once per simulation tick
pub struct ApplyDriver<I> {
    jobs: Vec<ApplyScheduler<I>>,
}

impl<I> Default for ApplyDriver<I> {
    fn default() -> Self {
        Self { jobs: Vec::new() }
    }
}

impl<I> ApplyDriver<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scheduler and queue it; fails if its target is busy or gone
    pub fn submit(
        &mut self,
        mut scheduler: ApplyScheduler<I>,
        registry: &TargetRegistry,
    ) -> Result<(), ApplyError> {
        scheduler.start(registry)?;
        self.jobs.push(scheduler);
        Ok(())
    }

    /// Step every job once and return the ones that finished this tick
    pub fn tick<H>(&mut self, host: &mut H, registry: &TargetRegistry) -> Vec<ApplyScheduler<I>>
    where
        H: EntityHost<Instance = I>,
    {
        for job in &mut self.jobs {
            job.step(host, registry);
        }
        let (finished, active): (Vec<_>, Vec<_>) =
            self.jobs.drain(..).partition(|job| job.is_finished());
        self.jobs = active;
        finished
    }

    /// Cancel any job rebuilding into `target`
    pub fn cancel_target(&mut self, target: TargetHandle) {
        for job in self.jobs.iter_mut().filter(|job| job.target() == target) {
            job.cancel();
        }
    }

    pub fn active(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }
}
