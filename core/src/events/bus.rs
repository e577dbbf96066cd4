use std::sync::Mutex;

use tokio::sync::mpsc;

use super::model::TaskEvent;

/// Fans task events out to every subscribed observer, in emission order.
#[derive(Default)]
pub struct EventBus {
    observers: Mutex<Vec<mpsc::UnboundedSender<TaskEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TaskEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(tx);
        rx
    }

    pub fn attach(&self, tx: mpsc::UnboundedSender<TaskEvent>) {
        if let Ok(mut g) = self.observers.lock() {
            g.push(tx);
        }
    }

    pub fn emit(&self, ev: TaskEvent) {
        let Ok(mut g) = self.observers.lock() else {
            return;
        };
        // Observers whose receiver was dropped are pruned on the next send.
        g.retain(|tx| tx.send(ev.clone()).is_ok());
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|g| g.len()).unwrap_or(0)
    }
}
