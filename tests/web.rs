// Browser tests; run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use pixel_portfolio_fx::EffectsConfig;
use pixel_portfolio_fx::clock::{BrowserFrameLoop, BrowserScheduler, FrameClock, Scheduler};
use pixel_portfolio_fx::effects::EffectTriggers;
use pixel_portfolio_fx::particles::{DomParticleLayer, ParticleId, ParticleSystem};
use pixel_portfolio_fx::rng::EffectRng;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Event, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn particles_become_div_nodes_and_leave_on_completion() {
    let doc = web_sys::window().unwrap().document().unwrap();
    let container: HtmlElement = doc.create_element("div").unwrap().dyn_into().unwrap();
    doc.body().unwrap().append_child(&container).unwrap();

    let sink = Rc::new(|_id: ParticleId| {});
    let layer = DomParticleLayer::new(doc.clone(), container.clone(), sink);
    let cfg = EffectsConfig::default();
    let mut sys = ParticleSystem::initialize(3, layer, EffectRng::new(9), 800.0, cfg);
    let a = sys.spawn_particle().unwrap();
    sys.spawn_particle().unwrap();
    assert_eq!(container.child_element_count(), 2);
    let first = container.first_element_child().unwrap();
    assert_eq!(first.class_name(), "particle");

    assert!(sys.on_particle_animation_complete(a));
    assert!(!sys.on_particle_animation_complete(a));
    assert_eq!(container.child_element_count(), 1);
    assert_eq!(sys.layer().node_count(), 1);
}

#[wasm_bindgen_test]
fn start_without_page_markup_still_returns_a_handle() {
    let fx = pixel_portfolio_fx::start_effects().unwrap();
    assert_eq!(fx.pixel_count(), 0);
    assert_eq!(fx.particle_count(), 0);
    assert!(!fx.degraded());
    fx.destroy();
    fx.destroy();
}

#[wasm_bindgen_test]
fn hover_on_project_card_spawns_animated_sparkles() {
    let win = web_sys::window().unwrap();
    let doc = win.document().unwrap();
    let body = doc.body().unwrap();
    let card = doc.create_element("div").unwrap();
    card.set_class_name("project-card");
    body.append_child(&card).unwrap();

    let cfg = EffectsConfig::default();
    let mut triggers = EffectTriggers::attach(&win, &doc, &cfg).unwrap();
    // sparkle hover + ripple click on the card, plus window scroll
    assert_eq!(triggers.listener_count(), 3);

    let before = body.child_element_count();
    card.dispatch_event(&Event::new("mouseenter").unwrap()).unwrap();
    assert_eq!(body.child_element_count(), before + 5);

    triggers.teardown();
    assert_eq!(triggers.listener_count(), 0);
    card.remove();
}

#[wasm_bindgen_test]
fn frame_loop_cancel_is_idempotent() {
    let win = web_sys::window().unwrap();
    let clock = Rc::new(RefCell::new(FrameClock::new()));
    let frame_loop = BrowserFrameLoop::start(win, clock).unwrap();
    assert!(frame_loop.is_running());
    frame_loop.cancel();
    assert!(!frame_loop.is_running());
    frame_loop.cancel();
    assert!(!frame_loop.is_running());
}

#[wasm_bindgen_test]
fn scheduler_owns_live_closures_until_cancelled() {
    let sched = BrowserScheduler::new(web_sys::window().unwrap());
    let interval = sched.set_interval(1000, Box::new(|| {})).unwrap();
    sched.set_timeout(1000, Box::new(|| {})).unwrap();
    assert_eq!(sched.live_tasks(), 2);
    sched.cancel(interval);
    assert_eq!(sched.live_tasks(), 1);
    sched.cancel_all();
    assert_eq!(sched.live_tasks(), 0);
}

#[wasm_bindgen_test]
fn hover_on_skill_item_restarts_its_pulse() {
    let win = web_sys::window().unwrap();
    let doc = win.document().unwrap();
    let item: HtmlElement = doc.create_element("div").unwrap().dyn_into().unwrap();
    item.set_class_name("skill-item");
    doc.body().unwrap().append_child(&item).unwrap();

    let cfg = EffectsConfig::default();
    let mut triggers = EffectTriggers::attach(&win, &doc, &cfg).unwrap();
    // pulse hover on the item, plus window scroll
    assert_eq!(triggers.listener_count(), 2);

    item.dispatch_event(&Event::new("mouseenter").unwrap()).unwrap();
    let animation = item.style().get_property_value("animation").unwrap();
    assert!(animation.contains("glow-pulse"), "{animation}");

    triggers.teardown();
    item.remove();
}
