//! Fixed-timestep loop core.
//!
//! Simulation time advances in constant `interval` increments regardless of
//! how irregularly the browser delivers paint callbacks. `StepClock` is the
//! platform-neutral half: given a frame timestamp it decides how many ticks
//! are due, applies them with their authoritative tick times, and renders
//! once. `start_frame_loop` is the browser half: a self-rescheduling
//! `requestAnimationFrame` closure feeding real frame timestamps into
//! whatever the caller wires up.
//!
//! The clock is a plain value with no ambient time source; callers feed it
//! frame timestamps, real ones from the driver or hand-picked ones in tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::window;

/// Update/render sinks for one frame of the loop.
///
/// `update` runs once per due tick and receives that tick's simulation time,
/// always the previous tick time plus the interval, never the raw frame
/// timestamp. `render` runs exactly once per frame and receives the frame
/// timestamp, which it may use for purely cosmetic extrapolation.
pub trait Simulation {
    fn update(&mut self, tick_ms: f64);
    fn render(&mut self, frame_ms: f64);
}

/// Tracks the last applied tick time and the last render time.
///
/// `last_update` only ever moves in whole-interval increments from the
/// initial time, and never past the most recent frame timestamp.
#[derive(Debug, Clone, Copy)]
pub struct StepClock {
    interval: f64,   // tick size in ms
    last_update: f64, // sim time of the last applied tick
    last_render: f64, // frame time of the last render
}

impl StepClock {
    /// `interval` is the tick size in milliseconds and must be positive.
    pub fn new(interval: f64, initial_ms: f64) -> Self {
        assert!(interval > 0.0, "tick interval must be positive");
        Self {
            interval,
            last_update: initial_ms,
            last_render: initial_ms,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn last_update(&self) -> f64 {
        self.last_update
    }

    pub fn last_render(&self) -> f64 {
        self.last_render
    }

    /// Number of whole ticks elapsed between the last applied tick and
    /// `frame_ms`. Zero until the next tick boundary is reached; exactly one
    /// on the boundary itself.
    pub fn due_steps(&self, frame_ms: f64) -> u32 {
        let elapsed = frame_ms - self.last_update;
        if elapsed < self.interval {
            0
        } else {
            (elapsed / self.interval).floor() as u32
        }
    }

    /// Runs one frame: applies every due tick in order, renders once, and
    /// records `frame_ms` as the render time. Returns the tick count.
    ///
    /// There is no cap on ticks per frame: after a long stall (backgrounded
    /// tab) every overdue tick runs synchronously here before the render.
    pub fn advance_frame<S: Simulation>(&mut self, sim: &mut S, frame_ms: f64) -> u32 {
        let due = self.due_steps(frame_ms);
        for _ in 0..due {
            self.last_update += self.interval;
            sim.update(self.last_update);
        }
        sim.render(frame_ms);
        self.last_render = frame_ms;
        due
    }
}

// --- Browser frame driver -----------------------------------------------------

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Cancellation handle for a running frame loop.
///
/// `stop()` is best-effort: it cancels the pending animation-frame request
/// and flags the closure, but a callback already dispatched by the browser
/// may still run once. Callers must tolerate at most one extra frame.
pub struct LoopHandle {
    raf_id: Rc<Cell<Option<i32>>>,
    stopped: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.stopped.set(true);
        if let Some(id) = self.raf_id.take() {
            if let Some(w) = window() {
                let _ = w.cancel_animation_frame(id);
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Starts a self-sustaining `requestAnimationFrame` loop invoking `on_frame`
/// with each frame timestamp. The callback re-arms itself at the top of each
/// invocation, before any frame work, so the loop survives long frames.
///
/// Fails if the platform cannot schedule the first callback. If rescheduling
/// fails mid-run the loop halts with a console warning; there is no recovery.
pub fn start_frame_loop<F>(mut on_frame: F) -> Result<LoopHandle, JsValue>
where
    F: FnMut(f64) + 'static,
{
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let raf_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
    let stopped: Rc<Cell<bool>> = Rc::new(Cell::new(false));

    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    let raf_in_cb = raf_id.clone();
    let stopped_in_cb = stopped.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        if stopped_in_cb.get() {
            return;
        }
        if let Some(w) = window() {
            match w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref())
            {
                Ok(id) => raf_in_cb.set(Some(id)),
                Err(_) => {
                    web_sys::console::warn_1(&"frame scheduling unavailable, loop halted".into());
                }
            }
        }
        on_frame(ts);
    }) as Box<dyn FnMut(f64)>));

    let id = win.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref())?;
    raf_id.set(Some(id));
    Ok(LoopHandle { raf_id, stopped })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        updates: u32,
        renders: u32,
    }

    impl Simulation for Counting {
        fn update(&mut self, _tick_ms: f64) {
            self.updates += 1;
        }
        fn render(&mut self, _frame_ms: f64) {
            self.renders += 1;
        }
    }

    #[test]
    fn due_steps_boundaries() {
        let clock = StepClock::new(50.0, 1_000.0);
        assert_eq!(clock.due_steps(1_000.0), 0);
        assert_eq!(clock.due_steps(1_049.9), 0);
        assert_eq!(clock.due_steps(1_050.0), 1);
        assert_eq!(clock.due_steps(1_120.0), 2);
    }

    #[test]
    fn advance_frame_counts_and_bookkeeping() {
        let mut clock = StepClock::new(50.0, 0.0);
        let mut sim = Counting {
            updates: 0,
            renders: 0,
        };
        let ran = clock.advance_frame(&mut sim, 120.0);
        assert_eq!(ran, 2);
        assert_eq!(sim.updates, 2);
        assert_eq!(sim.renders, 1);
        assert_eq!(clock.last_update(), 100.0);
        assert_eq!(clock.last_render(), 120.0);
    }
}
