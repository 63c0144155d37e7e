//! Drifting particle pool.
//!
//! Particles live in a generational arena; the visible node bound to each one
//! lives behind a [`ParticleLayer`] keyed by the same handle. The pool never
//! holds more than `capacity` live particles and a completed handle can never
//! touch a newer particle that reused its slot.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::clock::{Scheduler, TaskHandle};
use crate::config::EffectsConfig;
use crate::error::Result;
use crate::rng::EffectRng;

mod dom;

pub use dom::{CompletionSink, DomParticleLayer, attach_dom_particles};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleId {
    index: u32,
    generation: u32,
}

impl ParticleId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSpec {
    pub start_x: f64,
    pub drift: f64,
    pub duration_ms: f64,
}

impl ParticleSpec {
    pub fn random(rng: &mut EffectRng, viewport_width: f64, cfg: &EffectsConfig) -> Self {
        Self {
            start_x: rng.next_f64() * viewport_width.max(0.0),
            drift: (rng.next_f64() - 0.5) * cfg.drift_span_px,
            duration_ms: rng.span(cfg.min_duration_ms, cfg.duration_span_ms),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Pending,
    Active,
    Completed,
}

/// The visible surface particles are inserted into.
pub trait ParticleLayer {
    /// Show a node for `id`; its completion must eventually be reported back
    /// through [`ParticleSystem::on_particle_animation_complete`].
    fn insert(&mut self, id: ParticleId, spec: &ParticleSpec) -> Result<()>;
    /// Remove the node for `id`; unknown ids are ignored.
    fn remove(&mut self, id: ParticleId);
}

// --- Arena ------------------------------------------------------------------------

struct Slot {
    generation: u32,
    entry: Option<(ParticleSpec, Lifecycle)>,
}

pub struct ParticlePool {
    capacity: usize,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: Vec<ParticleId>, // insertion order
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.live.len() >= self.capacity
    }

    pub fn live(&self) -> &[ParticleId] {
        &self.live
    }

    pub fn get(&self, id: ParticleId) -> Option<(&ParticleSpec, Lifecycle)> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref().map(|(s, l)| (s, *l))
    }

    fn alloc(&mut self, spec: ParticleSpec) -> Option<ParticleId> {
        if self.is_full() {
            return None;
        }
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some((spec, Lifecycle::Pending));
        let id = ParticleId {
            index,
            generation: slot.generation,
        };
        self.live.push(id);
        Some(id)
    }

    fn set_state(&mut self, id: ParticleId, state: Lifecycle) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation {
                if let Some((_, l)) = slot.entry.as_mut() {
                    *l = state;
                }
            }
        }
    }

    /// Frees the slot; false when `id` is stale or already released.
    fn release(&mut self, id: ParticleId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.entry.is_none() {
            return false;
        }
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live.retain(|l| *l != id);
        true
    }
}

// --- Lifecycle manager ---------------------------------------------------------------

pub struct ParticleSystem<L: ParticleLayer> {
    pool: ParticlePool,
    layer: L,
    rng: EffectRng,
    viewport_width: f64,
    cfg: EffectsConfig,
}

impl<L: ParticleLayer> ParticleSystem<L> {
    pub fn initialize(
        capacity: usize,
        layer: L,
        rng: EffectRng,
        viewport_width: f64,
        cfg: EffectsConfig,
    ) -> Self {
        Self {
            pool: ParticlePool::new(capacity),
            layer,
            rng,
            viewport_width,
            cfg,
        }
    }

    pub fn population(&self) -> usize {
        self.pool.len()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut L {
        &mut self.layer
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
    }

    /// None at capacity or when the surface rejected the node.
    pub fn spawn_particle(&mut self) -> Option<ParticleId> {
        if self.pool.is_full() {
            return None;
        }
        let spec = ParticleSpec::random(&mut self.rng, self.viewport_width, &self.cfg);
        let id = self.pool.alloc(spec)?;
        match self.layer.insert(id, &spec) {
            Ok(()) => {
                self.pool.set_state(id, Lifecycle::Active);
                Some(id)
            }
            Err(e) => {
                log::debug!("particle insert failed: {e}");
                self.pool.release(id);
                None
            }
        }
    }

    /// Drop a finished particle. Repeated or stale completions do nothing.
    pub fn on_particle_animation_complete(&mut self, id: ParticleId) -> bool {
        if !matches!(self.pool.get(id), Some((_, Lifecycle::Active))) {
            return false;
        }
        self.pool.set_state(id, Lifecycle::Completed);
        self.layer.remove(id);
        self.pool.release(id)
    }

    /// Interval body: one spawn when below capacity.
    pub fn replenish(&mut self) -> Option<ParticleId> {
        if self.pool.is_full() {
            return None;
        }
        self.spawn_particle()
    }

    /// Remove every even-indexed live particle (insertion order) from both
    /// the population and the surface. Returns how many were removed.
    pub fn cull_even(&mut self) -> usize {
        let doomed: Vec<ParticleId> = self.pool.live().iter().step_by(2).copied().collect();
        for id in &doomed {
            self.layer.remove(*id);
            self.pool.release(*id);
        }
        let (culled, remain) = (doomed.len(), self.pool.len());
        log::debug!("culled {culled} particles, {remain} remain");
        doomed.len()
    }

    pub fn clear(&mut self) {
        let all: Vec<ParticleId> = self.pool.live().to_vec();
        for id in all {
            self.layer.remove(id);
            self.pool.release(id);
        }
    }
}

pub type SharedParticles<L> = Rc<RefCell<ParticleSystem<L>>>;

/// Cancellation handles for the stagger and replenish tasks.
pub struct ParticleTasks {
    stagger: Rc<Cell<Option<TaskHandle>>>,
    replenish: Option<TaskHandle>,
}

impl ParticleTasks {
    pub fn stagger_running(&self) -> bool {
        self.stagger.get().is_some()
    }

    /// Cancel both tasks. Idempotent.
    pub fn cancel<S: Scheduler + ?Sized>(&mut self, scheduler: &S) {
        if let Some(h) = self.stagger.take() {
            scheduler.cancel(h);
        }
        if let Some(h) = self.replenish.take() {
            scheduler.cancel(h);
        }
    }
}

/// Start the staggered intro (one spawn per `stagger_ms`, ending after
/// `capacity` firings or once the pool is full) and the replenish interval.
pub fn start_particle_tasks<L, S>(
    system: &SharedParticles<L>,
    scheduler: &Rc<S>,
) -> Result<ParticleTasks>
where
    L: ParticleLayer + 'static,
    S: Scheduler + 'static,
{
    let (stagger_ms, replenish_ms, capacity) = {
        let sys = system.borrow();
        (sys.cfg.stagger_ms, sys.cfg.replenish_ms, sys.capacity())
    };

    let stagger_slot: Rc<Cell<Option<TaskHandle>>> = Rc::new(Cell::new(None));
    let fired = Rc::new(Cell::new(0usize));
    let (sys, slot, sched) = (
        Rc::downgrade(system),
        stagger_slot.clone(),
        Rc::downgrade(scheduler),
    );
    let stagger = scheduler.set_interval(
        stagger_ms,
        Box::new(move || {
            let Some(sys) = sys.upgrade() else { return };
            let full = {
                let Ok(mut s) = sys.try_borrow_mut() else {
                    return;
                };
                s.spawn_particle();
                s.pool.is_full()
            };
            fired.set(fired.get() + 1);
            if full || fired.get() >= capacity {
                if let (Some(h), Some(sched)) = (slot.take(), sched.upgrade()) {
                    sched.cancel(h);
                }
            }
        }),
    )?;
    stagger_slot.set(Some(stagger));

    let sys = Rc::downgrade(system);
    let replenish = scheduler.set_interval(
        replenish_ms,
        Box::new(move || {
            if let Some(sys) = sys.upgrade() {
                if let Ok(mut s) = sys.try_borrow_mut() {
                    s.replenish();
                }
            }
        }),
    );
    let replenish = match replenish {
        Ok(h) => h,
        Err(e) => {
            scheduler.cancel(stagger);
            return Err(e);
        }
    };

    Ok(ParticleTasks {
        stagger: stagger_slot,
        replenish: Some(replenish),
    })
}
