mod bus;
mod model;

pub use bus::EventBus;
pub use model::{LogLevel, TaskEvent, TaskEventKind};
