/// Fixed-point scale: a ratio of 256 means one logic tick per iteration.
pub const TICK_SCALE: i64 = 256;

const RATIO_MIN: i64 = 25;
const HISTORY_SLOTS: usize = 10;
const DEFAULT_RATE: u32 = 50;

/// Adaptive timestep tracking how far the loop is ahead of or behind
/// wall-clock time over a sliding window of recent iterations.
///
/// All inputs are millisecond timestamps supplied by the caller, so the
/// arithmetic can be driven synthetically in tests.
pub struct AdaptiveTimestep {
    tick_ms: i64,
    min_sleep_ms: i64,
    history: [Option<i64>; HISTORY_SLOTS],
    slot: usize,
    ratio: i64,
    delta: i64,
    accumulator: i64,
    fps: u32,
}

impl Default for AdaptiveTimestep {
    fn default() -> Self {
        Self::new(DEFAULT_RATE)
    }
}

impl AdaptiveTimestep {
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            tick_ms: 1000 / i64::from(ticks_per_second.max(1)),
            min_sleep_ms: 1,
            history: [None; HISTORY_SLOTS],
            slot: 0,
            ratio: TICK_SCALE,
            delta: 1,
            accumulator: 0,
            fps: 0,
        }
    }

    pub fn set_rate(&mut self, ticks_per_second: u32) {
        self.tick_ms = 1000 / i64::from(ticks_per_second.max(1));
    }

    pub fn set_min_sleep(&mut self, min_sleep_ms: i64) {
        self.min_sleep_ms = min_sleep_ms.max(0);
    }

    pub fn tick_ms(&self) -> i64 {
        self.tick_ms
    }

    pub fn ratio(&self) -> i64 {
        self.ratio
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Fill every history slot with `now_ms` so the first window has a full
    /// baseline instead of ten cold slots.
    pub fn seed(&mut self, now_ms: i64) {
        self.history = [Some(now_ms); HISTORY_SLOTS];
    }

    /// Record one iteration boundary and return how many milliseconds the
    /// loop should sleep before running its tick batch.
    ///
    /// The returned delay is already floored at the configured minimum. When
    /// the window shows the loop running faster than the target rate the
    /// ratio saturates at 256 and the delay grows; when it shows the loop
    /// behind, the ratio drops (down to 25) so the next tick batch catches
    /// up.
    pub fn advance(&mut self, now_ms: i64) -> i64 {
        let last_ratio = self.ratio;
        let last_delta = self.delta;
        self.ratio = 300;
        self.delta = 1;

        let reference = self.history[self.slot];
        match reference {
            None => {
                self.ratio = last_ratio;
                self.delta = last_delta;
            }
            Some(then) if now_ms > then => {
                self.ratio = (self.tick_ms * TICK_SCALE * HISTORY_SLOTS as i64) / (now_ms - then);
            }
            Some(_) => {}
        }

        if self.ratio < RATIO_MIN {
            self.ratio = RATIO_MIN;
        } else if self.ratio > TICK_SCALE {
            self.ratio = TICK_SCALE;
            if let Some(then) = reference {
                self.delta = self.tick_ms - (now_ms - then) / HISTORY_SLOTS as i64;
            }
        }

        self.history[self.slot] = Some(now_ms);
        self.slot = (self.slot + 1) % HISTORY_SLOTS;

        if self.delta > 1 {
            // Shift the whole window forward so one catch-up sleep does not
            // read as lost time in later ratio computations.
            for slot in self.history.iter_mut().flatten() {
                *slot += self.delta;
            }
        }

        if self.delta < self.min_sleep_ms {
            self.delta = self.min_sleep_ms;
        }

        self.delta
    }

    /// Number of logic ticks to run this iteration. Accumulates the current
    /// ratio until it crosses one full tick, then wraps the remainder.
    pub fn consume_ticks(&mut self) -> u32 {
        let mut ticks = 0;
        while self.accumulator < TICK_SCALE {
            self.accumulator += self.ratio;
            ticks += 1;
        }
        self.accumulator &= 0xff;

        if self.tick_ms > 0 {
            self.fps = ((1000 * self.ratio) / (self.tick_ms * TICK_SCALE)) as u32;
        }

        ticks
    }
}
