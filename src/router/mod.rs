//! Router Module
//!
//! Parses command lines and dispatches them to worker threads.
//!
//! ## Worker layout
//! ```text
//!              ┌──────────────┐
//!   GET/TTL ──>│ read queue   │──> reader 0..N  ─┐
//!   ZRANGE     └──────────────┘                  │
//!   ZRANK                                        ├──> Engine
//!              ┌──────────────┐                  │
//!   SET/DEL ──>│ write queue  │──> writer        ─┘
//!   EXPIRE     └──────────────┘
//!   ZADD
//! ```
//!
//! Readers run concurrently under the engine's shared lock. All writes go
//! through the single writer, so they apply in submission order.

mod worker;

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::engine::Engine;
use crate::error::{Result, SkipKvError};
use crate::protocol::{parse_line, Command, Reply};

use worker::{Job, Message};

/// Command router with a reader pool and one writer
pub struct Router {
    engine: Arc<Engine>,
    readers: Sender<Message>,
    writer: Sender<Message>,
    read_workers: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Router {
    /// Start a router sized by the engine's `read_workers` setting
    pub fn new(engine: Arc<Engine>) -> Result<Self> {
        let read_workers = engine.config().read_workers;
        Self::with_workers(engine, read_workers)
    }

    /// Start a router with `read_workers` reader threads
    pub fn with_workers(engine: Arc<Engine>, read_workers: usize) -> Result<Self> {
        if read_workers == 0 {
            return Err(SkipKvError::Config("read_workers must be at least 1".into()));
        }

        let (readers, read_queue) = channel::unbounded();
        let (writer, write_queue) = channel::unbounded();

        let mut handles = Vec::with_capacity(read_workers + 1);
        for id in 0..read_workers {
            handles.push(worker::spawn(
                format!("skipkv-reader-{}", id),
                Arc::clone(&engine),
                Receiver::clone(&read_queue),
            )?);
        }
        handles.push(worker::spawn(
            "skipkv-writer".to_string(),
            Arc::clone(&engine),
            write_queue,
        )?);

        info!(read_workers, "Router started");

        Ok(Self {
            engine,
            readers,
            writer,
            read_workers,
            handles: Mutex::new(handles),
        })
    }

    /// Parse and run one command line
    ///
    /// A malformed line is answered with its catalog error without reaching
    /// a worker.
    pub fn execute(&self, line: &str) -> Result<Reply> {
        match parse_line(line) {
            Ok(command) => self.dispatch(command),
            Err(e) => Ok(Reply::Error(e)),
        }
    }

    /// Run a parsed command and wait for its reply
    pub fn dispatch(&self, command: Command) -> Result<Reply> {
        self.submit(command)?
            .recv()
            .map_err(|_| SkipKvError::Shutdown)?
    }

    /// Queue a command; the reply arrives on the returned channel
    pub fn submit(&self, command: Command) -> Result<Receiver<Result<Reply>>> {
        let (reply, receiver) = channel::bounded(1);
        let queue = if command.is_read_only() {
            &self.readers
        } else {
            &self.writer
        };
        queue
            .send(Message::Run(Job { command, reply }))
            .map_err(|_| SkipKvError::Shutdown)?;
        Ok(receiver)
    }

    /// Stop the workers after they drain queued jobs
    pub fn shutdown(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }

        for _ in 0..self.read_workers {
            let _ = self.readers.send(Message::Stop);
        }
        let _ = self.writer.send(Message::Stop);

        for handle in handles {
            if handle.join().is_err() {
                error!("Router worker panicked");
            }
        }
        debug!("Router stopped");
    }

    /// The engine commands run against
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown();
    }
}
