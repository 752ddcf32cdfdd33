use std::collections::HashSet;

pub const KEY_LEFT: i32 = 1;
pub const KEY_RIGHT: i32 = 2;
pub const KEY_UP: i32 = 3;
pub const KEY_DOWN: i32 = 4;
pub const NO_KEY: i32 = -1;

const QUEUE_LEN: usize = 128;

/// A raw key as reported by the host, before normalization to a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Char(char),
}

impl Key {
    /// Normalized code: arrows map to the 1..4 sentinels, printable keys to
    /// their character code.
    pub fn code(self) -> i32 {
        match self {
            Key::Left => KEY_LEFT,
            Key::Right => KEY_RIGHT,
            Key::Up => KEY_UP,
            Key::Down => KEY_DOWN,
            Key::Char(c) => c as i32,
        }
    }
}

/// Ring buffer of pressed-key codes plus the current held set.
///
/// The queue is lossy: the write cursor advances unconditionally, so once it
/// laps the read cursor the oldest unread entries are overwritten and the
/// queue momentarily reads as empty. There is no backpressure.
pub struct KeyQueue {
    buffer: [i32; QUEUE_LEN],
    read_pos: usize,
    write_pos: usize,
    held: HashSet<i32>,
}

impl Default for KeyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyQueue {
    pub fn new() -> Self {
        Self {
            buffer: [NO_KEY; QUEUE_LEN],
            read_pos: 0,
            write_pos: 0,
            held: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        let code = key.code();
        self.held.insert(code);
        self.buffer[self.write_pos] = code;
        self.write_pos = (self.write_pos + 1) % QUEUE_LEN;
    }

    /// Releases only update the held set; the queued press stays readable.
    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key.code());
    }

    /// Next unread code in press order, or [`NO_KEY`].
    pub fn poll(&mut self) -> i32 {
        if self.read_pos == self.write_pos {
            return NO_KEY;
        }
        let code = self.buffer[self.read_pos];
        self.read_pos = (self.read_pos + 1) % QUEUE_LEN;
        code
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.is_code_held(key.code())
    }

    pub fn is_code_held(&self, code: i32) -> bool {
        self.held.contains(&code)
    }

    /// Fast-forward the read cursor past everything currently queued.
    pub fn discard_pending(&mut self) {
        self.read_pos = self.write_pos;
    }
}

/// One-shot click record, cleared by the loop after every logic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseClick {
    pub button: i32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default)]
pub struct MouseState {
    button: i32,
    x: i32,
    y: i32,
    click: Option<MouseClick>,
}

impl MouseState {
    pub fn press(&mut self, button: i32, x: i32, y: i32) {
        self.button = button;
        self.x = x;
        self.y = y;
        self.click = Some(MouseClick { button, x, y });
    }

    pub fn release(&mut self) {
        self.button = 0;
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn button(&self) -> i32 {
        self.button
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn click(&self) -> Option<MouseClick> {
        self.click
    }

    pub fn clear_click(&mut self) {
        self.click = None;
    }
}
