// Integration tests (native) for the `pixel-portfolio-fx` crate.
// These drive the particle pool and governor through the virtual scheduler
// and a recording surface, so they run under `cargo test` on the host.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use pixel_portfolio_fx::EffectsConfig;
use pixel_portfolio_fx::app::reduce_quality;
use pixel_portfolio_fx::clock::{FrameClock, VirtualScheduler};
use pixel_portfolio_fx::error::Result;
use pixel_portfolio_fx::governor::{PerformanceGovernor, QualityState};
use pixel_portfolio_fx::particles::{
    ParticleId, ParticleLayer, ParticleSpec, ParticleSystem, start_particle_tasks,
};
use pixel_portfolio_fx::rng::EffectRng;
use pixel_portfolio_fx::style::StyleFlag;

#[derive(Default)]
struct Surface {
    shown: HashSet<ParticleId>,
    peak: usize,
}

impl ParticleLayer for Surface {
    fn insert(&mut self, id: ParticleId, _spec: &ParticleSpec) -> Result<()> {
        self.shown.insert(id);
        self.peak = self.peak.max(self.shown.len());
        Ok(())
    }
    fn remove(&mut self, id: ParticleId) {
        self.shown.remove(&id);
    }
}

fn shared_system(cfg: &EffectsConfig) -> Rc<RefCell<ParticleSystem<Surface>>> {
    Rc::new(RefCell::new(ParticleSystem::initialize(
        cfg.particle_capacity,
        Surface::default(),
        EffectRng::new(2024),
        1440.0,
        cfg.clone(),
    )))
}

// capacity 30, replenish 500ms, stagger 200ms
#[test]
fn staggered_startup_fills_pool_by_5800ms() {
    let cfg = EffectsConfig::default();
    let system = shared_system(&cfg);
    let sched = Rc::new(VirtualScheduler::new());
    let mut tasks = start_particle_tasks(&system, &sched).unwrap();

    assert_eq!(system.borrow().population(), 0);
    sched.advance_to(199.0);
    assert_eq!(system.borrow().population(), 0);
    sched.advance_to(200.0);
    assert_eq!(system.borrow().population(), 1);

    sched.advance_to(5800.0);
    assert_eq!(system.borrow().population(), 30);
    assert!(!tasks.stagger_running());
    // only the replenish interval remains
    assert_eq!(sched.pending(), 1);

    tasks.cancel(&*sched);
    assert_eq!(sched.pending(), 0);
    assert!(system.borrow().layer().peak <= 30);
}

#[test]
fn replenish_refills_after_completions() {
    let cfg = EffectsConfig::default();
    let system = shared_system(&cfg);
    let sched = Rc::new(VirtualScheduler::new());
    let _tasks = start_particle_tasks(&system, &sched).unwrap();
    sched.advance_to(6000.0);
    assert_eq!(system.borrow().population(), 30);

    let done: Vec<ParticleId> = system.borrow().pool().live()[..3].to_vec();
    for id in &done {
        assert!(system.borrow_mut().on_particle_animation_complete(*id));
    }
    assert_eq!(system.borrow().population(), 27);
    for id in &done {
        assert!(!system.borrow().layer().shown.contains(id));
    }

    // three replenish ticks, one particle each
    sched.advance_to(7500.0);
    assert_eq!(system.borrow().population(), 30);
    assert!(system.borrow().layer().peak <= 30);
}

#[test]
fn cancelled_tasks_never_spawn() {
    let cfg = EffectsConfig::default();
    let system = shared_system(&cfg);
    let sched = Rc::new(VirtualScheduler::new());
    let mut tasks = start_particle_tasks(&system, &sched).unwrap();
    sched.advance_to(400.0);
    let before = system.borrow().population();
    tasks.cancel(&*sched);
    tasks.cancel(&*sched);
    sched.advance_to(10_000.0);
    assert_eq!(system.borrow().population(), before);
}

#[test]
fn dropped_system_stops_task_effects() {
    let cfg = EffectsConfig::default();
    let system = shared_system(&cfg);
    let sched = Rc::new(VirtualScheduler::new());
    let _tasks = start_particle_tasks(&system, &sched).unwrap();
    drop(system);
    // tasks hold only weak references; firing them is harmless
    sched.advance_to(3000.0);
}

#[derive(Default)]
struct RecordingFlag {
    enables: u32,
}

impl StyleFlag for RecordingFlag {
    fn enable_reduced_quality(&mut self) {
        self.enables += 1;
    }
    fn reduced_quality(&self) -> bool {
        self.enables > 0
    }
}

// fps 20 for two windows: one mitigation, population halved once, flag set once
#[test]
fn low_fps_halves_population_and_sets_flag_once() {
    let cfg = EffectsConfig::default();
    let system = shared_system(&cfg);
    for _ in 0..30 {
        system.borrow_mut().spawn_particle();
    }
    let before: Vec<ParticleId> = system.borrow().pool().live().to_vec();

    let governor = Rc::new(RefCell::new(PerformanceGovernor::new(0.0, &cfg)));
    let flag = Rc::new(RefCell::new(RecordingFlag::default()));
    let culled = Rc::new(RefCell::new(Vec::new()));
    let mut clock = FrameClock::new();
    let (gov, sys) = (governor.clone(), system.clone());
    let (f, c) = (flag.clone(), culled.clone());
    clock.subscribe(move |now| {
        let mut mitigate = |fps: u32| {
            let removed = reduce_quality(Some(&sys), &mut *f.borrow_mut(), fps);
            c.borrow_mut().push(removed);
        };
        gov.borrow_mut().sample(now, &mut mitigate);
    });

    assert!(!flag.borrow().reduced_quality());
    for frame in 1..=40 {
        clock.tick(frame as f64 * 50.0);
    }

    assert_eq!(governor.borrow().state(), QualityState::Degraded);
    assert_eq!(governor.borrow().fps(), 20);
    assert_eq!(*culled.borrow(), vec![15]);
    assert_eq!(flag.borrow().enables, 1);
    assert!(flag.borrow().reduced_quality());
    let after: Vec<ParticleId> = system.borrow().pool().live().to_vec();
    let odd: Vec<ParticleId> = before.iter().skip(1).step_by(2).copied().collect();
    assert_eq!(after, odd);
    assert_eq!(system.borrow().layer().shown.len(), 15);
}

#[test]
fn reduce_quality_without_particles_still_sets_flag() {
    let mut flag = RecordingFlag::default();
    let removed = reduce_quality::<Surface, _>(None, &mut flag, 12);
    assert_eq!(removed, 0);
    assert!(flag.reduced_quality());
}
