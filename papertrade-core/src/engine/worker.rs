//! Portfolio worker: one thread owns one portfolio.
//!
//! Callers talk to the worker over an `mpsc` channel. Commands are handled
//! one at a time, so a tick pass is never interleaved with another tick or
//! with a submission for the same portfolio. Each command carries its own
//! reply sender.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::factory::OrderRequest;
use super::reporting::OrderStatistics;
use super::simulator::Simulator;
use super::tick::TickReport;
use crate::domain::{Order, OrderId, Portfolio, PriceSnapshot};
use crate::error::OrderError;

/// Commands accepted by a [`PortfolioWorker`].
#[derive(Debug)]
pub enum WorkerCommand {
    Submit {
        request: OrderRequest,
        reply: Sender<Result<Order, OrderError>>,
    },
    Tick {
        snapshot: PriceSnapshot,
        reply: Sender<TickReport>,
    },
    Cancel {
        id: OrderId,
        reply: Sender<Result<Order, OrderError>>,
    },
    Stats {
        reply: Sender<OrderStatistics>,
    },
    /// Clone of the current portfolio state.
    Snapshot {
        reply: Sender<Portfolio>,
    },
    Shutdown,
}

/// Errors from talking to a worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker thread has stopped")]
    Disconnected,
}

/// Handle to a running portfolio worker.
#[derive(Debug)]
pub struct PortfolioWorker {
    tx: Sender<WorkerCommand>,
    handle: Option<JoinHandle<Portfolio>>,
}

impl PortfolioWorker {
    /// Move `portfolio` onto a new thread.
    pub fn spawn(portfolio: Portfolio, simulator: Simulator) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("papertrade-portfolio".into())
            .spawn(move || worker_loop(rx, portfolio, simulator))?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Raw command sender, for callers that batch or forward commands.
    pub fn sender(&self) -> Sender<WorkerCommand> {
        self.tx.clone()
    }

    pub fn submit(&self, request: OrderRequest) -> Result<Result<Order, OrderError>, WorkerError> {
        self.call(|reply| WorkerCommand::Submit { request, reply })
    }

    pub fn tick(&self, snapshot: PriceSnapshot) -> Result<TickReport, WorkerError> {
        self.call(|reply| WorkerCommand::Tick { snapshot, reply })
    }

    pub fn cancel(&self, id: OrderId) -> Result<Result<Order, OrderError>, WorkerError> {
        self.call(|reply| WorkerCommand::Cancel { id, reply })
    }

    pub fn stats(&self) -> Result<OrderStatistics, WorkerError> {
        self.call(|reply| WorkerCommand::Stats { reply })
    }

    pub fn snapshot(&self) -> Result<Portfolio, WorkerError> {
        self.call(|reply| WorkerCommand::Snapshot { reply })
    }

    /// Stop the worker and take the portfolio back.
    pub fn shutdown(mut self) -> Result<Portfolio, WorkerError> {
        // The send fails only if the thread already exited; join still
        // returns the portfolio in that case.
        let _ = self.tx.send(WorkerCommand::Shutdown);
        let handle = self.handle.take().ok_or(WorkerError::Disconnected)?;
        handle.join().map_err(|_| WorkerError::Disconnected)
    }

    fn call<T>(
        &self,
        make: impl FnOnce(Sender<T>) -> WorkerCommand,
    ) -> Result<T, WorkerError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| WorkerError::Disconnected)?;
        reply_rx.recv().map_err(|_| WorkerError::Disconnected)
    }
}

impl Drop for PortfolioWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(WorkerCommand::Shutdown);
            if handle.join().is_err() {
                warn!("portfolio worker panicked");
            }
        }
    }
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    mut portfolio: Portfolio,
    simulator: Simulator,
) -> Portfolio {
    debug!("portfolio worker started");
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(cmd) => handle_command(cmd, &mut portfolio, &simulator),
        }
    }
    debug!("portfolio worker stopped");
    portfolio
}

/// Reply send failures mean the caller stopped waiting; the command has
/// still been applied.
fn handle_command(cmd: WorkerCommand, portfolio: &mut Portfolio, simulator: &Simulator) {
    match cmd {
        WorkerCommand::Submit { request, reply } => {
            let _ = reply.send(simulator.submit_order(portfolio, request));
        }
        WorkerCommand::Tick { snapshot, reply } => {
            let _ = reply.send(simulator.process_tick(portfolio, &snapshot));
        }
        WorkerCommand::Cancel { id, reply } => {
            let _ = reply.send(simulator.cancel_order(portfolio, id));
        }
        WorkerCommand::Stats { reply } => {
            let _ = reply.send(simulator.order_statistics(portfolio));
        }
        WorkerCommand::Snapshot { reply } => {
            let _ = reply.send(portfolio.clone());
        }
        WorkerCommand::Shutdown => {} // handled in loop
    }
}
