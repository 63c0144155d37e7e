use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement};

use super::{ParticleId, ParticleLayer, ParticleSpec, ParticleSystem, SharedParticles};
use crate::config::EffectsConfig;
use crate::error::{EffectsError, Result};
use crate::rng::EffectRng;

pub type CompletionSink = Rc<dyn Fn(ParticleId)>;

struct Node {
    el: HtmlElement,
    _on_end: Closure<dyn FnMut(web_sys::Event)>,
}

/// `div.particle` nodes inside the page's particle container. CSS drives the
/// float animation; `animationend` reports completion back to the pool.
pub struct DomParticleLayer {
    doc: Document,
    container: HtmlElement,
    nodes: HashMap<ParticleId, Node>,
    on_complete: CompletionSink,
}

impl DomParticleLayer {
    pub fn new(doc: Document, container: HtmlElement, on_complete: CompletionSink) -> Self {
        Self {
            doc,
            container,
            nodes: HashMap::new(),
            on_complete,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn build(&self, spec: &ParticleSpec) -> Result<HtmlElement> {
        let el: HtmlElement = self
            .doc
            .create_element("div")?
            .dyn_into()
            .map_err(|_| EffectsError::Js("div is not an HtmlElement".into()))?;
        el.set_class_name("particle");
        let style = el.style();
        style.set_property("left", &format!("{}px", spec.start_x))?;
        style.set_property("--drift", &format!("{}px", spec.drift))?;
        let seconds = spec.duration_ms / 1000.0;
        style.set_property("animation-duration", &format!("{seconds}s"))?;
        Ok(el)
    }
}

impl ParticleLayer for DomParticleLayer {
    fn insert(&mut self, id: ParticleId, spec: &ParticleSpec) -> Result<()> {
        let el = self.build(spec)?;
        let sink = self.on_complete.clone();
        let handler: Box<dyn FnMut(web_sys::Event)> =
            Box::new(move |_evt: web_sys::Event| sink(id));
        let on_end = Closure::wrap(handler);
        el.add_event_listener_with_callback("animationend", on_end.as_ref().unchecked_ref())?;
        self.container.append_child(&el)?;
        let node = Node {
            el,
            _on_end: on_end,
        };
        self.nodes.insert(id, node);
        Ok(())
    }

    fn remove(&mut self, id: ParticleId) {
        if let Some(node) = self.nodes.remove(&id) {
            node.el.remove();
        }
    }
}

/// Pool bound to `cfg.particle_container`, with completions routed back to
/// the returned system through a weak reference.
pub fn attach_dom_particles(
    doc: &Document,
    cfg: &EffectsConfig,
    viewport_width: f64,
) -> Result<SharedParticles<DomParticleLayer>> {
    let container: HtmlElement = doc
        .query_selector(&cfg.particle_container)?
        .ok_or_else(|| EffectsError::MissingElement(cfg.particle_container.clone()))?
        .dyn_into()
        .map_err(|_| EffectsError::MissingElement(cfg.particle_container.clone()))?;

    let system = Rc::new_cyclic(|weak: &Weak<RefCell<ParticleSystem<DomParticleLayer>>>| {
        let weak = weak.clone();
        let sink: CompletionSink = Rc::new(move |id: ParticleId| {
            if let Some(sys) = weak.upgrade() {
                if let Ok(mut s) = sys.try_borrow_mut() {
                    s.on_particle_animation_complete(id);
                }
            }
        });
        RefCell::new(ParticleSystem::initialize(
            cfg.particle_capacity,
            DomParticleLayer::new(doc.clone(), container, sink),
            EffectRng::from_entropy(),
            viewport_width,
            cfg.clone(),
        ))
    });
    Ok(system)
}
