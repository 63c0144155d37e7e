use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

use super::{Scheduler, SharedFrameClock, TaskHandle};
use crate::error::Result;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// The one `requestAnimationFrame` loop of the page; ticks a shared [`super::FrameClock`].
pub struct BrowserFrameLoop {
    window: Window,
    callback: FrameCallback,
    raf_id: Rc<Cell<Option<i32>>>,
    running: Rc<Cell<bool>>,
}

impl BrowserFrameLoop {
    pub fn start(window: Window, clock: SharedFrameClock) -> Result<Self> {
        let f: FrameCallback = Rc::new(RefCell::new(None));
        let g = f.clone();
        let raf_id = Rc::new(Cell::new(None));
        let running = Rc::new(Cell::new(true));

        let (loop_win, loop_id, loop_running) = (window.clone(), raf_id.clone(), running.clone());
        *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            if !loop_running.get() {
                return;
            }
            // a subscriber tearing something down mid-frame must not panic the loop
            match clock.try_borrow_mut() {
                Ok(mut c) => c.tick(ts),
                Err(_) => log::debug!("frame clock busy, skipping tick"),
            }
            if let Some(cb) = f.borrow().as_ref() {
                if let Ok(id) = loop_win.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    loop_id.set(Some(id));
                }
            }
        }) as Box<dyn FnMut(f64)>));

        if let Some(cb) = g.borrow().as_ref() {
            let id = window.request_animation_frame(cb.as_ref().unchecked_ref())?;
            raf_id.set(Some(id));
        }
        Ok(Self {
            window,
            callback: g,
            raf_id,
            running,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Stop rescheduling and drop the frame closure. Idempotent.
    pub fn cancel(&self) {
        if !self.running.replace(false) {
            return;
        }
        if let Some(id) = self.raf_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        // breaks the closure -> cell -> closure cycle
        self.callback.borrow_mut().take();
    }
}

impl Drop for BrowserFrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// `setTimeout` / `setInterval` with every live closure owned here so that
/// `cancel_all` really frees them.
pub struct BrowserScheduler {
    window: Window,
    intervals: RefCell<HashMap<i32, Closure<dyn FnMut()>>>,
    timeouts: Rc<RefCell<HashMap<i32, Closure<dyn FnMut()>>>>,
}

impl BrowserScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            intervals: RefCell::new(HashMap::new()),
            timeouts: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn live_tasks(&self) -> usize {
        self.intervals.borrow().len() + self.timeouts.borrow().len()
    }

    pub fn cancel_all(&self) {
        for (id, _) in self.intervals.borrow_mut().drain() {
            self.window.clear_interval_with_handle(id);
        }
        for (id, _) in self.timeouts.borrow_mut().drain() {
            self.window.clear_timeout_with_handle(id);
        }
    }
}

impl Scheduler for BrowserScheduler {
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<TaskHandle> {
        let slot: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
        let (table, my_id) = (Rc::downgrade(&self.timeouts), slot.clone());
        let mut task = Some(task);
        let closure = Closure::wrap(Box::new(move || {
            if let Some(t) = task.take() {
                t();
            }
            // fired; drop our own entry (wasm-bindgen defers the free until we return)
            if let (Some(table), Some(id)) = (table.upgrade(), my_id.get()) {
                table.borrow_mut().remove(&id);
            }
        }) as Box<dyn FnMut()>);
        let id = self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms as i32,
        )?;
        slot.set(Some(id));
        self.timeouts.borrow_mut().insert(id, closure);
        Ok(TaskHandle(id))
    }

    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> Result<TaskHandle> {
        let closure = Closure::wrap(task);
        let id = self.window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            period_ms as i32,
        )?;
        self.intervals.borrow_mut().insert(id, closure);
        Ok(TaskHandle(id))
    }

    fn cancel(&self, handle: TaskHandle) {
        if self.intervals.borrow_mut().remove(&handle.0).is_some() {
            self.window.clear_interval_with_handle(handle.0);
        } else if self.timeouts.borrow_mut().remove(&handle.0).is_some() {
            self.window.clear_timeout_with_handle(handle.0);
        }
    }
}

impl Drop for BrowserScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
