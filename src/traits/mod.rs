pub mod graph;
pub mod source;
pub mod transport;

pub use graph::Graph;
pub use source::Source;
pub use transport::{ControlChannel, MessageReceiver, MessageSender};
