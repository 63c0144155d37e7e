use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, Window};

use super::{PixelField, Raster};
use crate::clock::{SharedFrameClock, SubscriptionId};
use crate::config::EffectsConfig;
use crate::dom::ListenerSet;
use crate::error::{EffectsError, Result};
use crate::rng::EffectRng;

pub struct CanvasRaster {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasRaster {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or(EffectsError::NoContext)?
            .dyn_into()
            .map_err(|_| EffectsError::NoContext)?;
        Ok(Self { canvas, ctx })
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.canvas.set_width(width.max(0.0) as u32);
        self.canvas.set_height(height.max(0.0) as u32);
    }
}

impl Raster for CanvasRaster {
    fn size(&self) -> (f64, f64) {
        (self.canvas.width() as f64, self.canvas.height() as f64)
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, alpha: f64) {
        self.ctx.save();
        self.ctx.set_global_alpha(alpha);
        self.ctx.set_fill_style(&JsValue::from_str(color));
        self.ctx.fill_rect(x, y, w, h);
        self.ctx.restore();
    }

    fn glow_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, alpha: f64, blur: f64) {
        self.ctx.save();
        self.ctx.set_global_alpha(alpha);
        self.ctx.set_fill_style(&JsValue::from_str(color));
        self.ctx.set_shadow_blur(blur);
        self.ctx.set_shadow_color(color);
        self.ctx.fill_rect(x, y, w, h);
        self.ctx.restore();
    }
}

/// Full-viewport canvas background: keeps the canvas sized to the window and
/// renders the pixel field on every frame clock tick.
pub struct PixelBackground {
    field: Rc<RefCell<PixelField<CanvasRaster>>>,
    clock: SharedFrameClock,
    subscription: Option<SubscriptionId>,
    listeners: ListenerSet,
}

impl PixelBackground {
    pub fn attach(
        win: &Window,
        doc: &Document,
        clock: SharedFrameClock,
        cfg: &EffectsConfig,
    ) -> Result<Self> {
        let canvas: HtmlCanvasElement = doc
            .get_element_by_id(&cfg.canvas_id)
            .ok_or_else(|| EffectsError::MissingElement(format!("#{}", cfg.canvas_id)))?
            .dyn_into()
            .map_err(|_| EffectsError::MissingElement(format!("canvas #{}", cfg.canvas_id)))?;
        let raster = CanvasRaster::new(canvas)?;
        let (w, h) = crate::dom::viewport_size()?;
        raster.resize(w, h);

        let field = Rc::new(RefCell::new(PixelField::initialize(
            raster,
            cfg.clone(),
            EffectRng::from_entropy(),
        )));

        let mut listeners = ListenerSet::default();
        let on_resize = field.clone();
        listeners.add(win.as_ref(), "resize", move |_evt| {
            let Ok((w, h)) = crate::dom::viewport_size() else {
                return;
            };
            if let Ok(mut f) = on_resize.try_borrow_mut() {
                f.raster().resize(w, h);
                f.on_viewport_resize(w, h);
            }
        })?;

        let on_frame = field.clone();
        let subscription = clock.borrow_mut().subscribe(move |now| {
            if let Ok(mut f) = on_frame.try_borrow_mut() {
                f.render_frame(now);
            }
        });

        let n = field.borrow().pixels().len();
        log::info!("pixel background attached ({n} pixels)");
        Ok(Self {
            field,
            clock,
            subscription: Some(subscription),
            listeners,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.field.borrow().pixels().len()
    }

    /// Stop rendering and drop the resize listener. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if let Some(id) = self.subscription {
            match self.clock.try_borrow_mut() {
                Ok(mut c) => {
                    c.unsubscribe(id);
                    self.subscription = None;
                }
                Err(_) => log::warn!("frame clock busy; pixel background still subscribed"),
            }
        }
        self.listeners.clear();
    }
}

impl Drop for PixelBackground {
    fn drop(&mut self) {
        self.teardown();
    }
}
