//! Router workers
//!
//! Each worker pulls jobs off its queue, runs them against the engine and
//! sends the result back on the job's reply channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{Command, Reply};

/// A command waiting for a worker
pub(crate) struct Job {
    pub command: Command,
    pub reply: Sender<Result<Reply>>,
}

pub(crate) enum Message {
    Run(Job),
    Stop,
}

/// Spawn a named worker thread draining `queue`
///
/// The worker exits on `Stop` or when every sender is gone. Jobs queued
/// before a `Stop` still run.
pub(crate) fn spawn(
    name: String,
    engine: Arc<Engine>,
    queue: Receiver<Message>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new().name(name).spawn(move || {
        debug!("Worker started");
        while let Ok(Message::Run(job)) = queue.recv() {
            let verb = job.command.command_type().name();
            let result = engine.execute(job.command);
            if let Err(e) = &result {
                warn!(verb, "Command failed: {}", e);
            }
            // The caller may have stopped waiting
            let _ = job.reply.send(result);
        }
        debug!("Worker stopped");
    })?;
    Ok(handle)
}
