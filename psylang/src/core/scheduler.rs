//! Scheduler and dispatcher.
//!
//! Decides which code runs on each tick. Within one tick the order is fixed:
//! key presses in arrival order, then due tasks in declaration order, then
//! the main program. Each interpreter call runs to completion before the next
//! one starts, so the shared state is never observed mid-update.
//!
//! Time is a [`Duration`] measured from the start of the run.

use std::time::Duration;

use tracing::{debug, info};

use crate::core::interpreter::{self, CodeBuffer};
use crate::core::parser::{KeyBindings, ParsedProgram, TaskSpec};
use crate::core::state::InterpreterState;

/// A task plus its next firing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub interval: Duration,
    pub code: String,
    pub next_fire: Duration,
}

impl ScheduledTask {
    /// First firing is one interval after `start`.
    pub fn new(spec: TaskSpec, start: Duration) -> Self {
        Self {
            interval: spec.interval,
            next_fire: start.saturating_add(spec.interval),
            code: spec.code,
        }
    }

    pub fn is_due(&self, now: Duration) -> bool {
        self.next_fire <= now
    }

    /// Move to the next slot of the fixed period. The slot is derived from the
    /// previous slot, never from the time the firing was processed.
    fn advance(&mut self) {
        self.next_fire = self.next_fire.saturating_add(self.interval);
    }
}

/// What a single [`Scheduler::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Key presses that matched a binding.
    pub keys_dispatched: usize,
    pub tasks_fired: usize,
    /// Whether any main-program code was interpreted.
    pub main_advanced: bool,
}

/// Drives the main program, the task list and the key bindings.
#[derive(Debug, Clone)]
pub struct Scheduler {
    main: CodeBuffer,
    bindings: KeyBindings,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    /// Build from a parse result. Display flags are not the scheduler's
    /// concern and are dropped.
    pub fn new(program: ParsedProgram, start: Duration) -> Self {
        let tasks = program
            .tasks
            .into_iter()
            .map(|spec| ScheduledTask::new(spec, start))
            .collect();
        Self {
            main: CodeBuffer::new(program.main),
            bindings: program.bindings,
            tasks,
        }
    }

    /// Run one tick: `keys` in order, then due tasks, then the main program.
    pub fn tick<S: AsRef<str>>(
        &mut self,
        state: &mut InterpreterState,
        now: Duration,
        keys: &[S],
    ) -> TickReport {
        let mut keys_dispatched = 0;
        for key in keys {
            if self.dispatch_key(state, key.as_ref()) {
                keys_dispatched += 1;
            }
        }
        let tasks_fired = self.fire_due_tasks(state, now);
        let main_advanced = self.advance_main(state);
        TickReport {
            keys_dispatched,
            tasks_fired,
            main_advanced,
        }
    }

    /// Run the block bound to `key` (case-insensitive). Returns whether a
    /// binding existed.
    pub fn dispatch_key(&self, state: &mut InterpreterState, key: &str) -> bool {
        let name = key.to_uppercase();
        match self.bindings.get(&name) {
            Some(code) => {
                debug!(key = %name, "dispatching key binding");
                interpreter::execute(state, code, 0);
                true
            }
            None => {
                debug!(key = %name, "no binding for key");
                false
            }
        }
    }

    /// Fire every task whose slot has come, each at most once per call.
    pub fn fire_due_tasks(&mut self, state: &mut InterpreterState, now: Duration) -> usize {
        let mut fired = 0;
        for (index, task) in self.tasks.iter_mut().enumerate() {
            if !task.is_due(now) {
                continue;
            }
            debug!(
                task = index,
                slot_secs = task.next_fire.as_secs_f64(),
                now_secs = now.as_secs_f64(),
                "firing task"
            );
            interpreter::execute(state, &task.code, 0);
            task.advance();
            fired += 1;
        }
        fired
    }

    /// Interpret the rest of the main program. A no-op once it is consumed.
    pub fn advance_main(&mut self, state: &mut InterpreterState) -> bool {
        if self.main.is_exhausted() {
            return false;
        }
        interpreter::run(state, &mut self.main);
        info!(len = self.main.len(), "main program consumed");
        true
    }

    /// Offset into the (possibly rewritten) main program.
    pub fn main_cursor(&self) -> usize {
        self.main.cursor()
    }

    pub fn main_program(&self) -> &str {
        self.main.text()
    }

    pub fn is_main_finished(&self) -> bool {
        self.main.is_exhausted()
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }
}
