use std::io;
use std::io::IsTerminal;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;

use shard::{
    ByteStream, ConnectTarget, GameApp, GameLoop, Key, NO_KEY, StreamError, WebSocketTransport,
};

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Terminal(#[from] io::Error),
}

/// Minimal host app: typed keys are sent to the server one frame per key,
/// echoed bytes are logged, Esc destroys the loop and 'q' stops it
/// gracefully.
pub struct DemoApp {
    target: Option<ConnectTarget>,
    stream: Option<ByteStream<WebSocketTransport>>,
    raw_mode: bool,
    ticks: u64,
    frames: u64,
    deadline: Option<u64>,
}

impl DemoApp {
    pub fn new(target: Option<ConnectTarget>, deadline: Option<u64>) -> Self {
        Self {
            target,
            stream: None,
            raw_mode: false,
            ticks: 0,
            frames: 0,
            deadline,
        }
    }

    fn pump_terminal(&mut self, ctx: &mut GameLoop) -> io::Result<()> {
        if !self.raw_mode {
            return Ok(());
        }
        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.code == KeyCode::Esc {
                ctx.destroy();
                continue;
            }
            let mapped = match key.code {
                KeyCode::Left => Key::Left,
                KeyCode::Right => Key::Right,
                KeyCode::Up => Key::Up,
                KeyCode::Down => Key::Down,
                KeyCode::Char(c) => Key::Char(c),
                _ => continue,
            };
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => ctx.key_down(mapped),
                KeyEventKind::Release => ctx.key_up(mapped),
            }
        }
        Ok(())
    }
}

impl GameApp for DemoApp {
    type Error = DemoError;

    async fn load(&mut self, ctx: &mut GameLoop) -> Result<(), DemoError> {
        if io::stdout().is_terminal() {
            terminal::enable_raw_mode()?;
            self.raw_mode = true;
        }

        if let Some(target) = self.target.clone() {
            ctx.show_progress(20, "Connecting to server...").await;
            let transport = WebSocketTransport::connect(&target).await?;
            self.stream = Some(ByteStream::new(transport));
        }

        ctx.show_progress(100, "Ready").await;
        Ok(())
    }

    fn update(&mut self, ctx: &mut GameLoop) -> Result<(), DemoError> {
        self.ticks += 1;
        if let Some(deadline) = self.deadline {
            if self.ticks >= deadline {
                ctx.destroy();
            }
        }

        loop {
            let key = ctx.poll_key();
            if key == NO_KEY {
                break;
            }
            if key == i32::from(b'q') {
                ctx.stop();
                continue;
            }
            if let Some(stream) = &mut self.stream {
                stream.write(&[(key & 0xff) as u8])?;
            }
        }
        Ok(())
    }

    async fn draw(&mut self, ctx: &mut GameLoop) -> Result<(), DemoError> {
        self.frames += 1;
        self.pump_terminal(ctx)?;

        if ctx.load_failed() {
            if self.frames % 512 == 1 {
                log::warn!("load failed, nothing to draw");
            }
            return Ok(());
        }

        if let Some(stream) = &mut self.stream {
            let available = stream.available();
            if available > 0 {
                let mut buf = vec![0u8; available];
                stream.read_bytes(&mut buf).await?;
                log::info!("received {} bytes", buf.len());
            }
        }

        if self.frames % 512 == 0 {
            log::info!("{} fps, {} ticks run", ctx.fps(), self.ticks);
        }
        Ok(())
    }

    fn unload(&mut self, _ctx: &mut GameLoop) {
        if let Some(stream) = &mut self.stream {
            stream.close();
        }
        if self.raw_mode {
            let _ = terminal::disable_raw_mode();
        }
        log::info!("shut down after {} ticks", self.ticks);
    }
}
