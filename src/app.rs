//! Composition root: builds every effect, wires the shared frame clock and
//! timers, and tears everything down again.
//!
//! Components are independent. One failing to attach (no canvas, no particle
//! container) is logged and skipped while the rest keep working.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

use crate::clock::{
    BrowserFrameLoop, BrowserScheduler, FrameClock, Scheduler, SharedFrameClock, SubscriptionId,
};
use crate::config::EffectsConfig;
use crate::dom::ListenerSet;
use crate::effects::EffectTriggers;
use crate::error::Result;
use crate::governor::{PerformanceGovernor, QualityState};
use crate::particles::{
    DomParticleLayer, ParticleLayer, ParticleTasks, SharedParticles, attach_dom_particles,
    start_particle_tasks,
};
use crate::pixels::PixelBackground;
use crate::style::{BodyClassFlag, StyleFlag, add_body_class, inject_styles};

struct ParticleManager {
    system: SharedParticles<DomParticleLayer>,
    tasks: ParticleTasks,
}

struct Shell {
    scheduler: Rc<BrowserScheduler>,
    clock: SharedFrameClock,
    frame_loop: Option<BrowserFrameLoop>,
    pixels: Option<PixelBackground>,
    particles: Option<ParticleManager>,
    governor: Rc<RefCell<PerformanceGovernor>>,
    governor_sub: Option<SubscriptionId>,
    triggers: Option<EffectTriggers>,
    listeners: ListenerSet,
    torn_down: bool,
}

/// Log and drop a component that failed to attach.
fn isolate<T>(name: &str, attempt: Result<T>) -> Option<T> {
    match attempt {
        Ok(v) => Some(v),
        Err(e) => {
            log::error!("{name} disabled: {e}");
            None
        }
    }
}

/// What the governor does on its degrade edge: cull the even-indexed
/// particles and switch the page to reduced quality. Returns the number of
/// particles removed.
pub fn reduce_quality<L: ParticleLayer, F: StyleFlag>(
    particles: Option<&SharedParticles<L>>,
    flag: &mut F,
    fps: u32,
) -> usize {
    let mut removed = 0;
    if let Some(sys) = particles {
        match sys.try_borrow_mut() {
            Ok(mut s) => removed = s.cull_even(),
            Err(_) => log::warn!("particle system busy, cull skipped"),
        }
    }
    flag.enable_reduced_quality();
    log::warn!("fps {fps}: reduced quality, culled {removed} particles");
    removed
}

fn attach_particles(
    doc: &Document,
    cfg: &EffectsConfig,
    scheduler: &Rc<BrowserScheduler>,
    width: f64,
) -> Result<ParticleManager> {
    let system = attach_dom_particles(doc, cfg, width)?;
    let tasks = start_particle_tasks(&system, scheduler)?;
    log::info!("particle system attached (capacity {})", cfg.particle_capacity);
    Ok(ParticleManager { system, tasks })
}

impl Shell {
    fn build(win: Window, doc: Document, cfg: EffectsConfig) -> Result<Rc<RefCell<Self>>> {
        cfg.validate()?;
        isolate("stylesheet", inject_styles(&doc));

        let scheduler = Rc::new(BrowserScheduler::new(win.clone()));
        let clock: SharedFrameClock = Rc::new(RefCell::new(FrameClock::new()));
        let (width, _) = crate::dom::viewport_size().unwrap_or((0.0, 0.0));

        let pixels = PixelBackground::attach(&win, &doc, clock.clone(), &cfg);
        let pixels = isolate("pixel background", pixels);
        let particles = attach_particles(&doc, &cfg, &scheduler, width);
        let particles = isolate("particle system", particles);
        let triggers = isolate("effect triggers", EffectTriggers::attach(&win, &doc, &cfg));

        // Governor shares the frame clock; on the degrade edge it culls the
        // logical population and flips the page-wide styling flag.
        let governor = PerformanceGovernor::new(crate::dom::now_ms(), &cfg);
        let governor = Rc::new(RefCell::new(governor));
        let mut flag = BodyClassFlag::new(doc.clone(), cfg.low_performance_class.clone());
        let cull_target = particles.as_ref().map(|p| Rc::downgrade(&p.system));
        let gov = governor.clone();
        let governor_sub = clock.borrow_mut().subscribe(move |now| {
            let mut mitigate = |fps: u32| {
                let target = cull_target.as_ref().and_then(|w| w.upgrade());
                reduce_quality(target.as_ref(), &mut flag, fps);
            };
            gov.borrow_mut().sample(now, &mut mitigate);
        });

        let frame_loop = BrowserFrameLoop::start(win.clone(), clock.clone());
        let frame_loop = isolate("frame loop", frame_loop);

        let loaded_doc = doc.clone();
        isolate(
            "loaded marker",
            scheduler.set_timeout(
                cfg.loaded_delay_ms,
                Box::new(move || {
                    if let Err(e) = add_body_class(&loaded_doc, "loaded") {
                        log::debug!("loaded marker skipped: {e}");
                    }
                }),
            ),
        );

        let shell = Rc::new(RefCell::new(Shell {
            scheduler,
            clock,
            frame_loop,
            pixels,
            particles,
            governor,
            governor_sub: Some(governor_sub),
            triggers,
            listeners: ListenerSet::default(),
            torn_down: false,
        }));

        // Keep the particle spawn band in step with the window width.
        let weak = Rc::downgrade(&shell);
        let mut listeners = ListenerSet::default();
        isolate(
            "resize tracking",
            listeners.add(win.as_ref(), "resize", move |_evt| {
                let Some(shell) = weak.upgrade() else {
                    return;
                };
                let Ok(s) = shell.try_borrow() else {
                    return;
                };
                if let (Some(p), Ok((w, _))) = (&s.particles, crate::dom::viewport_size()) {
                    if let Ok(mut sys) = p.system.try_borrow_mut() {
                        sys.set_viewport_width(w);
                    }
                }
            }),
        );
        let weak = Rc::downgrade(&shell);
        isolate(
            "unload teardown",
            listeners.add(win.as_ref(), "beforeunload", move |_evt| {
                if let Some(shell) = weak.upgrade() {
                    if let Ok(mut s) = shell.try_borrow_mut() {
                        s.teardown();
                    }
                }
            }),
        );
        shell.borrow_mut().listeners = listeners;

        log::info!("portfolio effects started");
        Ok(shell)
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(fl) = self.frame_loop.take() {
            fl.cancel();
        }
        if let Some(px) = self.pixels.as_mut() {
            px.teardown();
        }
        if let Some(id) = self.governor_sub.take() {
            if let Ok(mut c) = self.clock.try_borrow_mut() {
                c.unsubscribe(id);
            }
        }
        if let Some(p) = self.particles.as_mut() {
            p.tasks.cancel(&*self.scheduler);
            if let Ok(mut s) = p.system.try_borrow_mut() {
                s.clear();
            }
        }
        if let Some(t) = self.triggers.as_mut() {
            t.teardown();
        }
        self.scheduler.cancel_all();
        if let Ok(mut c) = self.clock.try_borrow_mut() {
            c.clear();
        }
        self.listeners.clear();
        log::info!("portfolio effects torn down");
    }
}

/// Handle returned to JS; `destroy()` stops every effect.
#[wasm_bindgen]
pub struct PortfolioEffects {
    shell: Rc<RefCell<Shell>>,
}

#[wasm_bindgen]
impl PortfolioEffects {
    /// Particles currently alive (0 when the particle system is disabled).
    pub fn particle_count(&self) -> usize {
        self.shell
            .borrow()
            .particles
            .as_ref()
            .map(|p| p.system.borrow().population())
            .unwrap_or(0)
    }

    pub fn pixel_count(&self) -> usize {
        self.shell
            .borrow()
            .pixels
            .as_ref()
            .map(|p| p.pixel_count())
            .unwrap_or(0)
    }

    /// Last measured frame rate.
    pub fn fps(&self) -> u32 {
        self.shell.borrow().governor.borrow().fps()
    }

    pub fn degraded(&self) -> bool {
        self.shell.borrow().governor.borrow().state() == QualityState::Degraded
    }

    pub fn destroy(&self) {
        self.shell.borrow_mut().teardown();
    }
}

pub fn start(cfg: EffectsConfig) -> Result<PortfolioEffects> {
    let win = crate::dom::win()?;
    let doc = crate::dom::document()?;
    let shell = Shell::build(win, doc, cfg)?;
    Ok(PortfolioEffects { shell })
}
