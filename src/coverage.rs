//! Coverage instrumentation for coverage-guided feedback.
//!
//! Code under test marks interesting points with the [`probe!`] macro. While
//! a [`ProbeTracer`] is running, every probe hit on the tracing thread is
//! recorded as an executed `(file, line)` pair, and consecutive hits within
//! the same file are recorded as a branch arc between the two lines.
//!
//! ```
//! use graphfuzz::coverage::{Instrumentation, ProbeTracer};
//!
//! fn abs(x: i32) -> i32 {
//!     if x < 0 {
//!         graphfuzz::probe!();
//!         -x
//!     } else {
//!         graphfuzz::probe!();
//!         x
//!     }
//! }
//!
//! let mut tracer = ProbeTracer::new();
//! tracer.start();
//! abs(-3);
//! tracer.stop();
//! tracer.save();
//! assert_eq!(tracer.executed_lines().len(), 1);
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// An executed source line.
pub type Line = (&'static str, u32);

/// An executed control-flow arc between two lines of the same file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Branch {
    /// The file both lines are in.
    pub file: &'static str,
    /// The line control came from.
    pub from: u32,
    /// The line control went to.
    pub to: u32,
}

/// A coverage measurement facility.
///
/// The calling protocol is `start`, run the code, `stop`, `save`, and then
/// read `executed_lines` or `executed_branches`. Measurements from one
/// start/stop window replace the previous ones.
pub trait Instrumentation: Send {
    /// Begin measuring.
    fn start(&mut self);
    /// Stop measuring.
    fn stop(&mut self);
    /// Make the last measurement available to the accessors.
    fn save(&mut self);
    /// Lines executed during the last saved measurement.
    fn executed_lines(&self) -> BTreeSet<Line>;
    /// Branch arcs taken during the last saved measurement.
    fn executed_branches(&self) -> BTreeSet<Branch>;
}

/// Instrumentation shared between several feedback oracles.
pub type SharedInstrumentation = Arc<Mutex<Box<dyn Instrumentation>>>;

/// Wrap an instrumentation for sharing.
pub fn shared(instrumentation: impl Instrumentation + 'static) -> SharedInstrumentation {
    Arc::new(Mutex::new(Box::new(instrumentation)))
}

struct Recorder {
    owner: Option<ThreadId>,
    lines: BTreeSet<Line>,
    branches: BTreeSet<Branch>,
    last: Option<Line>,
}

static RECORDER: Mutex<Recorder> = Mutex::new(Recorder {
    owner: None,
    lines: BTreeSet::new(),
    branches: BTreeSet::new(),
    last: None,
});
static RELEASED: Condvar = Condvar::new();
static ACTIVE: AtomicBool = AtomicBool::new(false);

fn recorder() -> MutexGuard<'static, Recorder> {
    RECORDER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record a probe hit. Use the [`probe!`] macro rather than calling this.
#[doc(hidden)]
pub fn hit(file: &'static str, line: u32) {
    if !ACTIVE.load(Ordering::Relaxed) {
        return;
    }
    let mut r = recorder();
    if r.owner != Some(thread::current().id()) {
        return;
    }
    r.lines.insert((file, line));
    if let Some((prev_file, prev_line)) = r.last {
        if prev_file == file {
            r.branches.insert(Branch {
                file,
                from: prev_line,
                to: line,
            });
        }
    }
    r.last = Some((file, line));
}

/// Mark the current source line as a coverage point.
#[macro_export]
macro_rules! probe {
    () => {
        $crate::coverage::hit(::core::file!(), ::core::line!())
    };
}

/// The [`probe!`]-based [`Instrumentation`].
///
/// Only one tracer measures at a time process-wide; `start` blocks until any
/// other running tracer stops. Probe hits on threads other than the one that
/// called `start` are ignored, so an abandoned worker thread cannot pollute a
/// later measurement.
#[derive(Debug, Default)]
pub struct ProbeTracer {
    running: bool,
    pending: (BTreeSet<Line>, BTreeSet<Branch>),
    lines: BTreeSet<Line>,
    branches: BTreeSet<Branch>,
}

impl ProbeTracer {
    /// A tracer that is not yet running.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Instrumentation for ProbeTracer {
    fn start(&mut self) {
        if self.running {
            return;
        }
        let me = thread::current().id();
        let mut r = recorder();
        while r.owner.is_some_and(|owner| owner != me) {
            r = RELEASED.wait(r).unwrap_or_else(PoisonError::into_inner);
        }
        r.owner = Some(me);
        r.lines.clear();
        r.branches.clear();
        r.last = None;
        ACTIVE.store(true, Ordering::SeqCst);
        self.running = true;
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        let mut r = recorder();
        self.pending = (
            std::mem::take(&mut r.lines),
            std::mem::take(&mut r.branches),
        );
        r.last = None;
        r.owner = None;
        ACTIVE.store(false, Ordering::SeqCst);
        drop(r);
        RELEASED.notify_all();
        self.running = false;
    }

    fn save(&mut self) {
        let (lines, branches) = std::mem::take(&mut self.pending);
        self.lines = lines;
        self.branches = branches;
    }

    fn executed_lines(&self) -> BTreeSet<Line> {
        self.lines.clone()
    }

    fn executed_branches(&self) -> BTreeSet<Branch> {
        self.branches.clone()
    }
}

impl Drop for ProbeTracer {
    fn drop(&mut self) {
        self.stop();
    }
}
