// messages.rs
//
// Channels shared by the coordinator and its tasks: the completion FIFO that
// carries finished car ids, and the shutdown signal every task listens to.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub type CarId = usize;

pub type CompletionSender = mpsc::Sender<CarId>;
pub type CompletionReceiver = mpsc::Receiver<CarId>;

/// Bounded FIFO of finished car ids. Sized so no car ever waits to report.
pub fn completion_channel(cars: usize) -> (CompletionSender, CompletionReceiver) {
    mpsc::channel(cars.max(1))
}

/// Raises the shutdown signal. Clones trigger the same signal.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Listening side of the shutdown signal, one per task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown is requested, or when every handle is gone.
    pub async fn wait(&mut self) {
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }
}

pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownHandle {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}
