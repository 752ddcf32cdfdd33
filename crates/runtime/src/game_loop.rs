use std::time::{Duration, Instant};

use tokio::time;

use crate::input::{Key, KeyQueue, MouseState};
use crate::timing::AdaptiveTimestep;

const SHUTDOWN_GRACE_MS: i64 = 4000;
const PROGRESS_YIELD: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Graceful-stop countdown, decremented once per iteration.
    Stopping(u32),
    /// Exit after the current iteration.
    Destroying,
    Terminated,
}

impl LoopState {
    pub fn is_active(self) -> bool {
        matches!(self, LoopState::Running | LoopState::Stopping(_))
    }
}

/// What happens to key events that were queued but not consumed by an
/// `update` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyDiscardPolicy {
    /// Drop unread events after every logic tick.
    #[default]
    EveryTick,
    /// Drop unread events once per iteration, after the whole tick batch.
    PerIteration,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub ticks_per_second: u32,
    pub min_sleep_ms: i64,
    pub key_discard: KeyDiscardPolicy,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 50,
            min_sleep_ms: 1,
            key_discard: KeyDiscardPolicy::EveryTick,
        }
    }
}

/// Host hooks driven by [`GameLoop::run`].
///
/// `load` runs once before the first iteration; a failure there is recorded
/// on the loop (`load_failed`) rather than ending the run, so `draw` can
/// present an error screen. Errors from `update` and `draw` end the run and
/// surface to the caller.
#[allow(async_fn_in_trait)]
pub trait GameApp {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn load(&mut self, ctx: &mut GameLoop) -> Result<(), Self::Error>;
    fn update(&mut self, ctx: &mut GameLoop) -> Result<(), Self::Error>;
    async fn draw(&mut self, ctx: &mut GameLoop) -> Result<(), Self::Error>;
    fn unload(&mut self, ctx: &mut GameLoop);
}

/// The real-time loop: owns lifecycle state, timing, and input, and drives a
/// [`GameApp`] at an adaptive target rate.
pub struct GameLoop {
    state: LoopState,
    timestep: AdaptiveTimestep,
    keys: KeyQueue,
    mouse: MouseState,
    key_discard: KeyDiscardPolicy,
    idle_ticks: u32,
    started: bool,
    double_start: bool,
    load_failed: bool,
    progress: Option<(u8, String)>,
    epoch: Instant,
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new(LoopConfig::default())
    }
}

impl GameLoop {
    pub fn new(config: LoopConfig) -> Self {
        let mut timestep = AdaptiveTimestep::new(config.ticks_per_second);
        timestep.set_min_sleep(config.min_sleep_ms);

        Self {
            state: LoopState::Running,
            timestep,
            keys: KeyQueue::new(),
            mouse: MouseState::default(),
            key_discard: config.key_discard,
            idle_ticks: 0,
            started: false,
            double_start: false,
            load_failed: false,
            progress: None,
            epoch: Instant::now(),
        }
    }

    /// Cancel a pending stop countdown. Destroyed or terminated loops are
    /// not resurrected.
    pub fn start(&mut self) {
        if self.state.is_active() {
            self.state = LoopState::Running;
        }
    }

    /// Begin a graceful shutdown: roughly four seconds of further iterations
    /// before `unload` runs.
    pub fn stop(&mut self) {
        if self.state.is_active() {
            let grace = (SHUTDOWN_GRACE_MS as u64).div_ceil(self.timestep.tick_ms().max(1) as u64);
            self.state = LoopState::Stopping(grace as u32);
        }
    }

    /// Exit after the current iteration.
    pub fn destroy(&mut self) {
        if self.state != LoopState::Terminated {
            self.state = LoopState::Destroying;
        }
    }

    pub fn set_loop_rate(&mut self, ticks_per_second: u32) {
        self.timestep.set_rate(ticks_per_second);
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn fps(&self) -> u32 {
        self.timestep.fps()
    }

    pub fn tick_ms(&self) -> i64 {
        self.timestep.tick_ms()
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn double_started(&self) -> bool {
        self.double_start
    }

    /// Logic ticks since the last input event.
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    pub fn progress(&self) -> Option<(u8, &str)> {
        self.progress.as_ref().map(|(pct, msg)| (*pct, msg.as_str()))
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    /// Next buffered key code, or [`crate::input::NO_KEY`].
    pub fn poll_key(&mut self) -> i32 {
        self.keys.poll()
    }

    pub fn is_key_held(&self, key: Key) -> bool {
        self.keys.is_held(key)
    }

    pub fn key_down(&mut self, key: Key) {
        self.idle_ticks = 0;
        self.keys.key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.idle_ticks = 0;
        self.keys.key_up(key);
    }

    pub fn mouse_pressed(&mut self, button: i32, x: i32, y: i32) {
        self.idle_ticks = 0;
        self.mouse.press(button, x, y);
    }

    pub fn mouse_released(&mut self) {
        self.idle_ticks = 0;
        self.mouse.release();
    }

    pub fn mouse_moved(&mut self, x: i32, y: i32) {
        self.idle_ticks = 0;
        self.mouse.set_position(x, y);
    }

    /// Record a progress report and yield a slice of time so the host's
    /// render path can present it mid-load.
    pub async fn show_progress(&mut self, percent: u8, message: &str) {
        log::debug!("progress {percent}%: {message}");
        self.progress = Some((percent, message.to_string()));
        time::sleep(PROGRESS_YIELD).await;
    }

    /// Run the cooperative main loop until the state machine terminates or a
    /// hook fails.
    pub async fn run<A: GameApp>(&mut self, app: &mut A) -> Result<(), A::Error> {
        if self.started {
            log::warn!("loop already started, ignoring second run");
            self.double_start = true;
            return Ok(());
        }
        self.started = true;

        self.show_progress(0, "Loading...").await;
        if let Err(err) = app.load(self).await {
            log::error!("load failed: {err}");
            self.load_failed = true;
        }

        let now = self.now_ms();
        self.timestep.seed(now);
        log::info!("main loop started ({}ms ticks)", self.timestep.tick_ms());

        while self.state.is_active() {
            if let LoopState::Stopping(remaining) = self.state {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.shutdown(app);
                    return Ok(());
                }
                self.state = LoopState::Stopping(remaining);
            }

            let delta = self.timestep.advance(self.now_ms());
            time::sleep(Duration::from_millis(delta.max(0) as u64)).await;

            let ticks = self.timestep.consume_ticks();
            for _ in 0..ticks {
                app.update(self)?;
                self.idle_ticks = self.idle_ticks.saturating_add(1);
                self.mouse.clear_click();
                if self.key_discard == KeyDiscardPolicy::EveryTick {
                    self.keys.discard_pending();
                }
            }
            if self.key_discard == KeyDiscardPolicy::PerIteration {
                self.keys.discard_pending();
            }

            app.draw(self).await?;
        }

        if self.state == LoopState::Destroying {
            self.shutdown(app);
        }
        Ok(())
    }

    fn shutdown<A: GameApp>(&mut self, app: &mut A) {
        log::info!("loop terminated");
        self.state = LoopState::Terminated;
        app.unload(self);
    }

    fn now_ms(&self) -> i64 {
        self.epoch.elapsed().as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingApp {
        updates: u32,
        draws: u32,
        unloads: u32,
        destroy_after: u32,
        fail_load: bool,
        polled: Vec<i32>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("load refused")]
    struct LoadRefused;

    impl GameApp for CountingApp {
        type Error = LoadRefused;

        async fn load(&mut self, _ctx: &mut GameLoop) -> Result<(), LoadRefused> {
            if self.fail_load { Err(LoadRefused) } else { Ok(()) }
        }

        fn update(&mut self, ctx: &mut GameLoop) -> Result<(), LoadRefused> {
            self.updates += 1;
            self.polled.push(ctx.poll_key());
            if self.updates >= self.destroy_after {
                ctx.destroy();
            }
            Ok(())
        }

        async fn draw(&mut self, ctx: &mut GameLoop) -> Result<(), LoadRefused> {
            self.draws += 1;
            if self.draws == 1 {
                ctx.key_down(Key::Char('a'));
                ctx.key_down(Key::Char('b'));
            }
            Ok(())
        }

        fn unload(&mut self, _ctx: &mut GameLoop) {
            self.unloads += 1;
        }
    }

    fn fast_config() -> LoopConfig {
        LoopConfig {
            ticks_per_second: 250,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn stop_sets_grace_countdown() {
        let mut shell = GameLoop::new(LoopConfig::default());
        assert_eq!(shell.tick_ms(), 20);

        shell.stop();
        assert_eq!(shell.state(), LoopState::Stopping(200));
    }

    #[test]
    fn start_cancels_pending_stop() {
        let mut shell = GameLoop::new(LoopConfig::default());
        shell.stop();
        shell.start();
        assert_eq!(shell.state(), LoopState::Running);
    }

    #[test]
    fn start_does_not_cancel_destroy() {
        let mut shell = GameLoop::new(LoopConfig::default());
        shell.destroy();
        shell.start();
        assert_eq!(shell.state(), LoopState::Destroying);
    }

    #[tokio::test]
    async fn destroy_terminates_within_an_iteration() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = CountingApp {
            destroy_after: 3,
            ..CountingApp::default()
        };

        shell.run(&mut app).await.unwrap();

        assert_eq!(shell.state(), LoopState::Terminated);
        assert_eq!(app.unloads, 1);
        assert!(app.updates >= 3);
    }

    #[tokio::test]
    async fn terminated_loop_stays_terminated() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = CountingApp {
            destroy_after: 1,
            ..CountingApp::default()
        };
        shell.run(&mut app).await.unwrap();

        shell.start();
        assert_eq!(shell.state(), LoopState::Terminated);
    }

    #[tokio::test]
    async fn second_run_sets_double_start_flag() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = CountingApp {
            destroy_after: 1,
            ..CountingApp::default()
        };
        shell.run(&mut app).await.unwrap();
        let updates = app.updates;

        shell.run(&mut app).await.unwrap();
        assert!(shell.double_started());
        assert_eq!(app.updates, updates);
    }

    #[tokio::test]
    async fn load_failure_is_flagged_not_fatal() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = CountingApp {
            destroy_after: 2,
            fail_load: true,
            ..CountingApp::default()
        };

        shell.run(&mut app).await.unwrap();

        assert!(shell.load_failed());
        assert!(app.updates >= 2);
        assert_eq!(app.unloads, 1);
    }

    #[tokio::test]
    async fn unconsumed_keys_are_discarded_after_each_tick() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = CountingApp {
            destroy_after: 6,
            ..CountingApp::default()
        };

        shell.run(&mut app).await.unwrap();

        // Two keys are queued during the first draw. Each update polls once
        // and the discard wipes the rest, so only 'a' is ever observed.
        let seen: Vec<i32> = app.polled.iter().copied().filter(|&k| k != -1).collect();
        assert_eq!(seen, vec![i32::from(b'a')]);
    }

    struct FailingApp;

    #[derive(Debug, thiserror::Error)]
    #[error("update exploded")]
    struct UpdateExploded;

    impl GameApp for FailingApp {
        type Error = UpdateExploded;

        async fn load(&mut self, _ctx: &mut GameLoop) -> Result<(), UpdateExploded> {
            Ok(())
        }

        fn update(&mut self, _ctx: &mut GameLoop) -> Result<(), UpdateExploded> {
            Err(UpdateExploded)
        }

        async fn draw(&mut self, _ctx: &mut GameLoop) -> Result<(), UpdateExploded> {
            Ok(())
        }

        fn unload(&mut self, _ctx: &mut GameLoop) {}
    }

    #[tokio::test]
    async fn update_errors_propagate_to_caller() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = FailingApp;

        assert!(shell.run(&mut app).await.is_err());
        assert_ne!(shell.state(), LoopState::Terminated);
    }

    #[tokio::test]
    async fn idle_ticks_reset_on_input() {
        let mut shell = GameLoop::new(fast_config());
        let mut app = CountingApp {
            destroy_after: 4,
            ..CountingApp::default()
        };
        shell.run(&mut app).await.unwrap();
        assert!(shell.idle_ticks() > 0);

        shell.key_down(Key::Left);
        assert_eq!(shell.idle_ticks(), 0);
    }
}
