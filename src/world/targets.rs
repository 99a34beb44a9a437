//! Destination targets for reconstruction.
//!
//! Targets live in an owned arena addressed by generational handles. A
//! handle to a removed target never resolves again, which is how a running
//! apply notices its destination is gone. Each target admits one apply at a
//! time through an `ApplyLease`.

use glam::Vec3;
use std::cell::Cell;
use std::rc::Rc;

use super::ApplyError;

/// Spatial membership test for a reconstruction volume
pub trait SpatialConstraint {
    fn is_within(&self, position: Vec3) -> bool;
}

impl<F> SpatialConstraint for F
where
    F: Fn(Vec3) -> bool,
{
    fn is_within(&self, position: Vec3) -> bool {
        self(position)
    }
}

/// Stable reference to a registered target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle {
    index: u32,
    generation: u32,
}

/// A live reconstruction destination
pub struct ApplyTarget {
    pub name: String,
    constraint: Option<Box<dyn SpatialConstraint>>,
    busy: Rc<Cell<bool>>,
}

impl ApplyTarget {
    /// Target with no volume restriction
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
            busy: Rc::new(Cell::new(false)),
        }
    }

    /// Target that only accepts positions inside `constraint`
    pub fn constrained(name: impl Into<String>, constraint: impl SpatialConstraint + 'static) -> Self {
        Self {
            name: name.into(),
            constraint: Some(Box::new(constraint)),
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn has_constraint(&self) -> bool {
        self.constraint.is_some()
    }

    /// True if the position is legal; always true without a constraint
    pub fn is_within(&self, position: Vec3) -> bool {
        self.constraint
            .as_ref()
            .map_or(true, |c| c.is_within(position))
    }

    /// Whether an apply currently holds this target
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }
}

/// Exclusive right to rebuild into one target; released on drop
#[derive(Debug)]
pub struct ApplyLease {
    busy: Rc<Cell<bool>>,
}

impl Drop for ApplyLease {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

struct Slot {
    generation: u32,
    target: Option<ApplyTarget>,
}

/// Owned arena of destination targets
#[derive(Default)]
pub struct TargetRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target and return its handle
    pub fn insert(&mut self, target: ApplyTarget) -> TargetHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.target = Some(target);
            return TargetHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            target: Some(target),
        });
        TargetHandle {
            index,
            generation: 0,
        }
    }

    /// Destroy a target; outstanding handles stop resolving
    pub fn remove(&mut self, handle: TargetHandle) -> Option<ApplyTarget> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let target = slot.target.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(target)
    }

    pub fn get(&self, handle: TargetHandle) -> Option<&ApplyTarget> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.target.as_ref())
    }

    pub fn contains(&self, handle: TargetHandle) -> bool {
        self.get(handle).is_some()
    }

    /// All live targets
    pub fn iter(&self) -> impl Iterator<Item = (TargetHandle, &ApplyTarget)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.target.as_ref().map(|target| {
                (
                    TargetHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    target,
                )
            })
        })
    }

    /// Constrained targets whose volume contains the position
    pub fn containing(&self, position: Vec3) -> Vec<TargetHandle> {
        self.iter()
            .filter(|(_, t)| t.has_constraint() && t.is_within(position))
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.target.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim a target for one apply
    pub fn lease(&self, handle: TargetHandle) -> Result<ApplyLease, ApplyError> {
        let target = self.get(handle).ok_or(ApplyError::TargetNotFound)?;
        if target.busy.get() {
            return Err(ApplyError::TargetBusy(target.name.clone()));
        }
        target.busy.set(true);
        Ok(ApplyLease {
            busy: Rc::clone(&target.busy),
        })
    }
}
