//! Host tick loop for `psylang run`.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, trace};

use crate::core::frame::Frame;
use crate::core::parser::{ParsedProgram, ToggleFlags};
use crate::core::scheduler::Scheduler;
use crate::core::state::InterpreterState;
use crate::io::clock::Clock;
use crate::io::config::RunConfig;
use crate::io::input::{InputEvent, InputSource};

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    /// The input source asked to quit.
    Quit,
    /// `max_ticks` ticks were executed.
    TickLimit { ticks: u64 },
    /// Nothing can change the grid any more: the main program is consumed,
    /// there are no scheduled tasks and the input source is exhausted.
    Idle,
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub ticks: u64,
    /// Clock time when the loop stopped.
    pub elapsed: Duration,
    pub stop: RunStop,
}

/// Interpreter state, scheduler and display flags for one run.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: InterpreterState,
    pub scheduler: Scheduler,
    pub flags: ToggleFlags,
    ticks: u64,
}

impl Session {
    /// Start a session whose tasks are timed from `start`.
    pub fn new(program: ParsedProgram, config: &RunConfig, start: Duration) -> Self {
        let state = match config.seed {
            Some(seed) => InterpreterState::seeded(config.grid_size, seed),
            None => InterpreterState::new(config.grid_size),
        };
        let flags = program.flags;
        Self {
            state,
            scheduler: Scheduler::new(program, start),
            flags,
            ticks: 0,
        }
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read-only view for renderers.
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            tick: self.ticks,
            pointer: self.state.pointer,
            flags: self.flags,
            grid: &self.state.grid,
        }
    }

    fn is_idle<I: InputSource>(&self, input: &I) -> bool {
        self.scheduler.is_main_finished()
            && self.scheduler.tasks().is_empty()
            && input.is_exhausted()
    }
}

/// Tick `session` until the input source quits, `max_ticks` is reached, or
/// the session goes idle.
///
/// Each tick polls input at the clock's current time, hands key presses and
/// the time to the scheduler, passes the resulting frame to `on_frame`, and
/// then sleeps until the next tick boundary. A quit request still completes
/// the tick it arrived in. Errors only come from `on_frame`.
pub fn run_loop<C, I, F>(
    session: &mut Session,
    clock: &mut C,
    input: &mut I,
    config: &RunConfig,
    mut on_frame: F,
) -> Result<RunOutcome>
where
    C: Clock,
    I: InputSource,
    F: FnMut(&Frame<'_>) -> Result<()>,
{
    let interval = config.tick_interval();
    let mut next_tick = clock.now();
    info!(
        fps = config.fps,
        max_ticks = ?config.max_ticks,
        tasks = session.scheduler.tasks().len(),
        bindings = session.scheduler.bindings().len(),
        "run started"
    );

    let stop = loop {
        if let Some(limit) = config.max_ticks {
            if session.ticks >= limit {
                break RunStop::TickLimit {
                    ticks: session.ticks,
                };
            }
        }

        let now = clock.now();
        let mut keys = Vec::new();
        let mut quit = false;
        for event in input.poll(now) {
            match event {
                InputEvent::KeyPressed(key) if !quit => keys.push(key),
                InputEvent::KeyPressed(_) => {}
                InputEvent::QuitRequested => quit = true,
            }
        }

        let report = session
            .scheduler
            .tick(&mut session.state, now, keys.as_slice());
        session.ticks += 1;
        trace!(
            tick = session.ticks,
            now_secs = now.as_secs_f64(),
            keys = report.keys_dispatched,
            tasks = report.tasks_fired,
            main = report.main_advanced,
            "tick"
        );
        on_frame(&session.frame())?;

        if quit {
            break RunStop::Quit;
        }
        if session.is_idle(input) {
            break RunStop::Idle;
        }

        next_tick += interval;
        clock.sleep_until(next_tick);
    };

    let outcome = RunOutcome {
        ticks: session.ticks,
        elapsed: clock.now(),
        stop,
    };
    info!(ticks = outcome.ticks, stop = ?outcome.stop, "run finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::{BracketMode, parse_source};
    use crate::io::clock::VirtualClock;
    use crate::io::input::{KeyPress, ScriptedInput};

    fn config(max_ticks: Option<u64>) -> RunConfig {
        RunConfig {
            fps: 10,
            max_ticks,
            seed: Some(0),
            ..RunConfig::default()
        }
    }

    fn session(source: &str, config: &RunConfig) -> Session {
        Session::new(parse_source(source, config.brackets), config, Duration::ZERO)
    }

    fn color(session: &Session, x: usize, y: usize) -> u8 {
        session
            .state
            .grid
            .get(x, y)
            .map(|cell| cell.color)
            .expect("cell")
    }

    fn presses(items: &[&str]) -> Vec<KeyPress> {
        items
            .iter()
            .map(|item| item.parse().expect("press"))
            .collect()
    }

    #[test]
    fn plain_program_goes_idle_after_first_tick() {
        let cfg = config(None);
        let mut session = session("3{+}>2{+}", &cfg);
        let mut clock = VirtualClock::new();
        let mut input = ScriptedInput::default();

        let outcome =
            run_loop(&mut session, &mut clock, &mut input, &cfg, |_| Ok(())).expect("run");

        assert_eq!(outcome.stop, RunStop::Idle);
        assert_eq!(outcome.ticks, 1);
        assert_eq!(color(&session, 0, 0), 3);
        assert_eq!(color(&session, 1, 0), 2);
    }

    #[test]
    fn tasks_fire_on_virtual_time_until_tick_limit() {
        let cfg = config(Some(25));
        let mut session = session("$[1.0][+]", &cfg);
        let mut clock = VirtualClock::new();
        let mut input = ScriptedInput::default();

        let outcome =
            run_loop(&mut session, &mut clock, &mut input, &cfg, |_| Ok(())).expect("run");

        // Ticks at 0.0, 0.1, ... 2.4 seconds: the task fires at 1.0 and 2.0.
        assert_eq!(outcome.stop, RunStop::TickLimit { ticks: 25 });
        assert_eq!(color(&session, 0, 0), 2);
        assert_eq!(
            session.scheduler.tasks()[0].next_fire,
            Duration::from_secs(3)
        );
    }

    #[test]
    fn scripted_keys_dispatch_and_quit_ends_the_loop() {
        let cfg = config(None);
        let mut session = session("A[+] B[>]", &cfg);
        let mut clock = VirtualClock::new();
        let mut input = ScriptedInput::new(
            presses(&["0.2:a", "0.2:a", "0.45:b", "0.5:a"]),
            Some(Duration::from_millis(500)),
        );

        let outcome =
            run_loop(&mut session, &mut clock, &mut input, &cfg, |_| Ok(())).expect("run");

        assert_eq!(outcome.stop, RunStop::Quit);
        assert_eq!(outcome.ticks, 6);
        assert_eq!(color(&session, 0, 0), 2);
        assert_eq!(color(&session, 1, 0), 1);
    }

    #[test]
    fn keys_after_quit_in_same_poll_are_dropped() {
        let cfg = config(None);
        let mut session = session("A[+]", &cfg);
        let mut clock = VirtualClock::new();
        // The first poll happens at 0.1s and sees press, quit, press.
        clock.advance(Duration::from_millis(100));
        let mut input = ScriptedInput::new(presses(&["0:a", "0.05:a"]), Some(Duration::ZERO));

        let outcome =
            run_loop(&mut session, &mut clock, &mut input, &cfg, |_| Ok(())).expect("run");

        assert_eq!(outcome.stop, RunStop::Quit);
        assert_eq!(outcome.ticks, 1);
        assert_eq!(color(&session, 0, 0), 1);
    }

    #[test]
    fn on_frame_sees_every_tick() {
        let cfg = config(Some(3));
        let mut session = session("$[0.1][>]showCell()", &cfg);
        let mut clock = VirtualClock::new();
        let mut input = ScriptedInput::default();
        let mut seen = Vec::new();

        run_loop(&mut session, &mut clock, &mut input, &cfg, |frame| {
            assert!(frame.flags.show_cell);
            seen.push((frame.tick, frame.pointer.x));
            Ok(())
        })
        .expect("run");

        assert_eq!(seen, vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[test]
    fn frame_errors_abort_the_loop() {
        let cfg = config(Some(10));
        let mut session = session("+", &cfg);
        let mut clock = VirtualClock::new();
        let mut input = ScriptedInput::default();

        let err = run_loop(&mut session, &mut clock, &mut input, &cfg, |_| {
            Err(anyhow::anyhow!("sink closed"))
        })
        .expect_err("sink error");
        assert!(err.to_string().contains("sink closed"));
    }

    #[test]
    fn balanced_config_reaches_the_parser() {
        let cfg = RunConfig {
            brackets: BracketMode::Balanced,
            ..config(None)
        };
        let mut session = session("Op[10]", &cfg);
        let mut clock = VirtualClock::new();
        let mut input = ScriptedInput::default();

        run_loop(&mut session, &mut clock, &mut input, &cfg, |_| Ok(())).expect("run");

        let opacity = session.state.grid.get(0, 0).map(|cell| cell.opacity);
        assert_eq!(opacity, Some(10));
    }
}
