mod dispatcher;
mod formatter;
mod payload;

pub use dispatcher::{Ack, WebhookDispatcher};
pub use formatter::MessageFormatter;
