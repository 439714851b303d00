pub mod stream;

pub use stream::{AssistantStreamState, StreamEvent};
