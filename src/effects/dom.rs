use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Animation, Document, Element, HtmlElement, MouseEvent, Window};

use super::{
    FrameThrottle, GLOW_TARGETS, PARALLAX_TARGETS, PULSE_TARGETS, REDUCED_MOTION_QUERY,
    RIPPLE_TARGETS, Rect, SPARKLE_TARGETS, hover_sparkles, parallax_offsets, ripple_for,
};
use crate::config::EffectsConfig;
use crate::dom::{ListenerSet, detach, query_all, restart_animation};
use crate::error::{EffectsError, Result};
use crate::rng::EffectRng;

const SPARKLE_CSS: &str = "position: fixed; width: 4px; height: 4px; background: #ff0040; \
    box-shadow: 0 0 10px #ff0040; border-radius: 50%; pointer-events: none; z-index: 1000;";
const RIPPLE_CSS: &str = "position: absolute; \
    background: radial-gradient(circle, rgba(255, 0, 64, 0.3) 0%, transparent 70%); \
    border-radius: 50%; pointer-events: none; z-index: 100;";

// web-sys only exposes `Element.animate` behind `web_sys_unstable_apis`.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = Element)]
    type Animatable;

    #[wasm_bindgen(method, catch, js_name = animate)]
    fn animate(
        this: &Animatable,
        keyframes: &Array,
        duration: f64,
    ) -> std::result::Result<Animation, JsValue>;
}

fn rect_of(el: &Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect {
        left: r.left(),
        top: r.top(),
        width: r.width(),
        height: r.height(),
    }
}

fn keyframe(props: &[(&str, JsValue)]) -> Result<Object> {
    let obj = Object::new();
    for (k, v) in props {
        Reflect::set(&obj, &JsValue::from_str(k), v)?;
    }
    Ok(obj)
}

/// Play `frames` on `el` and detach it when the animation finishes.
fn animate_then_remove(el: &HtmlElement, frames: &[Object], duration_ms: f64) -> Result<()> {
    let list = Array::new();
    for f in frames {
        list.push(f);
    }
    let anim = el.unchecked_ref::<Animatable>().animate(&list, duration_ms)?;
    let node: Element = el.clone().into();
    let on_finish = Closure::once_into_js(move || detach(&node));
    anim.set_onfinish(Some(on_finish.unchecked_ref()));
    Ok(())
}

fn spawn_sparkles(
    doc: &Document,
    target: &Element,
    count: usize,
    duration_ms: f64,
    rng: &mut EffectRng,
) -> Result<()> {
    let body = doc.body().ok_or_else(|| EffectsError::MissingElement("body".into()))?;
    for s in hover_sparkles(&rect_of(target), count, rng) {
        let el: HtmlElement = doc.create_element("div")?.unchecked_into();
        el.set_attribute("style", SPARKLE_CSS)?;
        let style = el.style();
        style.set_property("left", &format!("{}px", s.x))?;
        style.set_property("top", &format!("{}px", s.y))?;
        body.append_child(&el)?;
        let from = keyframe(&[
            ("transform", "translate(0, 0) scale(1)".into()),
            ("opacity", JsValue::from_f64(1.0)),
            ("easing", "ease-out".into()),
        ])?;
        let to = keyframe(&[
            ("transform", format!("translate({}px, {}px) scale(0)", s.dx, s.dy).into()),
            ("opacity", JsValue::from_f64(0.0)),
        ])?;
        animate_then_remove(&el, &[from, to], duration_ms)?;
    }
    Ok(())
}

fn spawn_ripple(
    doc: &Document,
    target: &HtmlElement,
    evt: &MouseEvent,
    duration_ms: f64,
) -> Result<()> {
    let (cx, cy) = (evt.client_x() as f64, evt.client_y() as f64);
    let r = ripple_for(&rect_of(target), cx, cy);
    let el: HtmlElement = doc.create_element("div")?.unchecked_into();
    el.set_attribute("style", RIPPLE_CSS)?;
    let style = el.style();
    style.set_property("width", &format!("{}px", r.size))?;
    style.set_property("height", &format!("{}px", r.size))?;
    style.set_property("left", &format!("{}px", r.left))?;
    style.set_property("top", &format!("{}px", r.top))?;
    target.style().set_property("position", "relative")?;
    target.append_child(&el)?;
    let from = keyframe(&[
        ("transform", "scale(0)".into()),
        ("opacity", JsValue::from_f64(1.0)),
        ("easing", "ease-out".into()),
    ])?;
    let to = keyframe(&[
        ("transform", "scale(2)".into()),
        ("opacity", JsValue::from_f64(0.0)),
    ])?;
    animate_then_remove(&el, &[from, to], duration_ms)?;
    Ok(())
}

fn prefers_reduced_motion(win: &Window) -> bool {
    matches!(win.match_media(REDUCED_MOTION_QUERY), Ok(Some(mq)) if mq.matches())
}

fn update_parallax(win: &Window, doc: &Document, base: f64, step: f64) -> Result<()> {
    if prefers_reduced_motion(win) {
        return Ok(());
    }
    let scrolled = win.scroll_y()?;
    let targets = query_all(doc, PARALLAX_TARGETS)?;
    let offsets = parallax_offsets(scrolled, targets.len(), base, step);
    for (el, y) in targets.iter().zip(offsets) {
        if let Some(el) = el.dyn_ref::<HtmlElement>() {
            el.style().set_property("transform", &format!("translateY({y}px)"))?;
        }
    }
    Ok(())
}

/// Listeners for every pointer/scroll effect on the page.
pub struct EffectTriggers {
    listeners: ListenerSet,
}

impl EffectTriggers {
    pub fn attach(win: &Window, doc: &Document, cfg: &EffectsConfig) -> Result<Self> {
        let mut listeners = ListenerSet::default();
        let rng = Rc::new(RefCell::new(EffectRng::from_entropy()));

        for card in query_all(doc, SPARKLE_TARGETS)? {
            let (doc, rng, target) = (doc.clone(), rng.clone(), card.clone());
            let (count, duration) = (cfg.hover_sparkles, cfg.sparkle_duration_ms);
            listeners.add(card.as_ref(), "mouseenter", move |_evt| {
                let mut rng = rng.borrow_mut();
                if let Err(e) = spawn_sparkles(&doc, &target, count, duration, &mut rng) {
                    log::debug!("hover sparkles skipped: {e}");
                }
            })?;
        }

        for item in query_all(doc, PULSE_TARGETS)? {
            let Ok(target) = item.clone().dyn_into::<HtmlElement>() else {
                continue;
            };
            listeners.add(item.as_ref(), "mouseenter", move |_evt| {
                if let Err(e) = restart_animation(&target, "glow-pulse 0.5s ease-out") {
                    log::debug!("skill pulse skipped: {e}");
                }
            })?;
        }

        for card in query_all(doc, GLOW_TARGETS)? {
            let target = card.clone();
            listeners.add(card.as_ref(), "mouseenter", move |_evt| {
                if let Ok(Some(glow)) = target.query_selector(".hover-glow") {
                    if let Ok(glow) = glow.dyn_into::<HtmlElement>() {
                        if let Err(e) = restart_animation(&glow, "pulse-glow 0.8s ease-out") {
                            log::debug!("hover glow skipped: {e}");
                        }
                    }
                }
            })?;
        }

        for el in query_all(doc, RIPPLE_TARGETS)? {
            let Ok(target) = el.clone().dyn_into::<HtmlElement>() else {
                continue;
            };
            let (doc, duration) = (doc.clone(), cfg.ripple_duration_ms);
            listeners.add(el.as_ref(), "click", move |evt| {
                let Some(evt) = evt.dyn_ref::<MouseEvent>() else {
                    return;
                };
                if let Err(e) = spawn_ripple(&doc, &target, evt, duration) {
                    log::debug!("ripple skipped: {e}");
                }
            })?;
        }

        let throttle = Rc::new(RefCell::new(FrameThrottle::default()));
        let (scroll_win, scroll_doc) = (win.clone(), doc.clone());
        let (base, step) = (cfg.parallax_base_speed, cfg.parallax_speed_step);
        listeners.add(win.as_ref(), "scroll", move |_evt| {
            if !throttle.borrow_mut().request() {
                return;
            }
            let (w, d, t) = (scroll_win.clone(), scroll_doc.clone(), throttle.clone());
            let cb = Closure::once_into_js(move |_ts: f64| {
                if let Err(e) = update_parallax(&w, &d, base, step) {
                    log::debug!("parallax skipped: {e}");
                }
                t.borrow_mut().done();
            });
            if scroll_win.request_animation_frame(cb.unchecked_ref()).is_err() {
                throttle.borrow_mut().done();
            }
        })?;

        log::info!("effect triggers attached ({} listeners)", listeners.len());
        Ok(Self { listeners })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn teardown(&mut self) {
        self.listeners.clear();
    }
}
