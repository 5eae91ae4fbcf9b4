//! External cancellation signal for a run.

use tokio::sync::watch;

/// Fires the paired `Interrupt`.
#[derive(Debug)]
pub struct InterruptTrigger {
    tx: watch::Sender<bool>,
}

impl InterruptTrigger {
    /// Requests cancellation. Idempotent.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes whether cancellation has been requested.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// Creates a linked trigger / interrupt pair.
    pub fn channel() -> (InterruptTrigger, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (InterruptTrigger { tx }, Interrupt { rx })
    }

    /// An interrupt that can never fire.
    pub fn never() -> Self {
        let (_, interrupt) = Self::channel();
        interrupt
    }

    /// True once the trigger has fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the trigger fires; pends forever if it never can.
    pub async fn fired(&self) {
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
