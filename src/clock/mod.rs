//! Frame clock and timer scheduling.
//!
//! Everything runs on one thread. The browser drives a single
//! `requestAnimationFrame` loop that fans out to [`FrameClock`] subscribers,
//! and timers go through the [`Scheduler`] trait so the particle manager can
//! be driven by real `setTimeout`/`setInterval` in the page or by
//! [`VirtualScheduler`] in host tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::error::Result;

mod browser;

pub use browser::{BrowserFrameLoop, BrowserScheduler};

// --- Frame fan-out -----------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type FrameFn = Box<dyn FnMut(f64)>;

/// Per-frame subscriber registry. `tick` is called once per display frame.
#[derive(Default)]
pub struct FrameClock {
    next_id: u32,
    subscribers: Vec<(SubscriptionId, FrameFn)>,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, f: impl FnMut(f64) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Returns false when `id` was not (or no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run every subscriber in subscription order.
    pub fn tick(&mut self, now_ms: f64) {
        self.frames += 1;
        for (_, f) in self.subscribers.iter_mut() {
            f(now_ms);
        }
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

pub type SharedFrameClock = Rc<RefCell<FrameClock>>;

// --- Timers -------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub i32);

/// Timeout / interval primitive. Callbacks never run re-entrantly.
pub trait Scheduler {
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<TaskHandle>;
    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> Result<TaskHandle>;
    /// Cancelling an unknown or already finished handle is a no-op.
    fn cancel(&self, handle: TaskHandle);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<TaskHandle> {
        (**self).set_timeout(delay_ms, task)
    }
    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> Result<TaskHandle> {
        (**self).set_interval(period_ms, task)
    }
    fn cancel(&self, handle: TaskHandle) {
        (**self).cancel(handle)
    }
}

enum VirtualTask {
    Once(Box<dyn FnOnce()>),
    Every(u32, Box<dyn FnMut()>),
}

struct Pending {
    due: f64,
    task: VirtualTask,
}

#[derive(Default)]
struct VirtualState {
    now: f64,
    next_id: i32,
    // scanned linearly for the earliest due task; counts stay tiny
    tasks: BTreeMap<TaskHandle, Pending>,
    cancelled_while_running: HashSet<TaskHandle>,
    running: Option<TaskHandle>,
}

/// Deterministic scheduler over virtual milliseconds for host-side tests.
#[derive(Clone, Default)]
pub struct VirtualScheduler {
    state: Rc<RefCell<VirtualState>>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.state.borrow().now
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    fn insert(&self, due_in: u32, task: VirtualTask) -> TaskHandle {
        let mut st = self.state.borrow_mut();
        let id = TaskHandle(st.next_id);
        st.next_id += 1;
        let due = st.now + due_in as f64;
        st.tasks.insert(id, Pending { due, task });
        id
    }

    /// Run every task due at or before `t`, in due order (ties by creation).
    pub fn advance_to(&self, t: f64) {
        loop {
            let next = {
                let mut st = self.state.borrow_mut();
                let found = st
                    .tasks
                    .iter()
                    .filter(|(_, p)| p.due <= t)
                    .min_by(|a, b| a.1.due.total_cmp(&b.1.due).then(a.0.cmp(b.0)))
                    .map(|(h, _)| *h);
                match found {
                    Some(h) => {
                        let pending = st.tasks.remove(&h);
                        if let Some(p) = &pending {
                            st.now = p.due;
                        }
                        st.running = Some(h);
                        pending.map(|p| (h, p))
                    }
                    None => None,
                }
            };
            let Some((handle, pending)) = next else {
                break;
            };
            match pending.task {
                VirtualTask::Once(f) => {
                    f();
                    let mut st = self.state.borrow_mut();
                    st.running = None;
                    st.cancelled_while_running.remove(&handle);
                }
                VirtualTask::Every(period, mut f) => {
                    f();
                    let mut st = self.state.borrow_mut();
                    st.running = None;
                    if !st.cancelled_while_running.remove(&handle) {
                        let next = Pending {
                            due: pending.due + period as f64,
                            task: VirtualTask::Every(period, f),
                        };
                        st.tasks.insert(handle, next);
                    }
                }
            }
        }
        let mut st = self.state.borrow_mut();
        if st.now < t {
            st.now = t;
        }
    }

    pub fn advance_by(&self, ms: f64) {
        let t = self.now() + ms;
        self.advance_to(t);
    }
}

impl Scheduler for VirtualScheduler {
    fn set_timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Result<TaskHandle> {
        Ok(self.insert(delay_ms, VirtualTask::Once(task)))
    }

    fn set_interval(&self, period_ms: u32, task: Box<dyn FnMut()>) -> Result<TaskHandle> {
        Ok(self.insert(period_ms, VirtualTask::Every(period_ms, task)))
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut st = self.state.borrow_mut();
        if st.tasks.remove(&handle).is_none() && st.running == Some(handle) {
            st.cancelled_while_running.insert(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn frame_clock_fans_out_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut clock = FrameClock::new();
        let a = log.clone();
        clock.subscribe(move |t| a.borrow_mut().push(("a", t)));
        let b = log.clone();
        let id_b = clock.subscribe(move |t| b.borrow_mut().push(("b", t)));
        assert_eq!(clock.subscriber_count(), 2);
        clock.tick(16.0);
        assert!(clock.unsubscribe(id_b));
        assert_eq!(clock.subscriber_count(), 1);
        assert!(!clock.unsubscribe(id_b));
        clock.tick(32.0);
        assert_eq!(*log.borrow(), vec![("a", 16.0), ("b", 16.0), ("a", 32.0)]);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn virtual_timeout_fires_once_at_due_time() {
        let sched = VirtualScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        sched
            .set_timeout(100, Box::new(move || h.set(h.get() + 1)))
            .unwrap();
        sched.advance_to(99.0);
        assert_eq!(hits.get(), 0);
        sched.advance_to(100.0);
        assert_eq!(hits.get(), 1);
        sched.advance_to(1000.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn virtual_interval_repeats_until_cancelled() {
        let sched = VirtualScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = sched
            .set_interval(50, Box::new(move || h.set(h.get() + 1)))
            .unwrap();
        sched.advance_to(200.0);
        assert_eq!(hits.get(), 4);
        sched.cancel(handle);
        sched.advance_to(400.0);
        assert_eq!(hits.get(), 4);
    }

    #[test]
    fn interval_can_cancel_itself() {
        let sched = VirtualScheduler::new();
        let slot: Rc<Cell<Option<TaskHandle>>> = Rc::new(Cell::new(None));
        let hits = Rc::new(Cell::new(0));
        let (s, h, inner) = (slot.clone(), hits.clone(), sched.clone());
        let handle = sched
            .set_interval(
                10,
                Box::new(move || {
                    h.set(h.get() + 1);
                    if h.get() == 3 {
                        if let Some(me) = s.get() {
                            inner.cancel(me);
                        }
                    }
                }),
            )
            .unwrap();
        slot.set(Some(handle));
        sched.advance_to(100.0);
        assert_eq!(hits.get(), 3);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn timeout_cancelling_itself_leaves_no_residue() {
        let sched = VirtualScheduler::new();
        let slot: Rc<Cell<Option<TaskHandle>>> = Rc::new(Cell::new(None));
        let (s, inner) = (slot.clone(), sched.clone());
        let handle = sched
            .set_timeout(
                10,
                Box::new(move || {
                    if let Some(me) = s.get() {
                        inner.cancel(me);
                    }
                }),
            )
            .unwrap();
        slot.set(Some(handle));
        sched.advance_to(20.0);
        assert_eq!(sched.pending(), 0);
        assert!(sched.state.borrow().cancelled_while_running.is_empty());
    }

    #[test]
    fn ties_run_in_creation_order() {
        let sched = VirtualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let o = order.clone();
            sched
                .set_timeout(10, Box::new(move || o.borrow_mut().push(i)))
                .unwrap();
        }
        sched.advance_by(10.0);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
