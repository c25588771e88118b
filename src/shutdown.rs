//! Ctrl+C handling.
//!
//! The handler flips a watch channel instead of a global flag, so any number
//! of tasks can hold a [`Shutdown`] and either check it or await it.

use tokio::sync::watch;

/// Cloneable handle that reports whether an interrupt was received.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Sending half, held by the signal handler or by tests.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Create a linked trigger/handle pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// Set up the Ctrl+C handler.
    ///
    /// This should be called once at program startup.
    pub fn install_ctrlc() -> Result<Self, ctrlc::Error> {
        let (trigger, shutdown) = channel();
        ctrlc::set_handler(move || {
            trigger.trigger();
        })?;
        Ok(shutdown)
    }

    /// A handle that never fires.
    pub fn never() -> Self {
        channel().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once an interrupt has been received.
    ///
    /// Pends forever if the trigger was dropped without firing.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
