pub mod chat;
pub mod list_models;
pub mod stream;

pub use chat::{
    ChatCompletionResponse, ChatMessage, ContentItem, CreateChatCompletionRequest, ImageUrl,
    MessageContent, ResponseChoice, ResponseMessage, Role, Tool, ToolCall, ToolCallFunction,
    ToolFunction,
};
pub use list_models::{ListModelsResponse, Model};
pub use stream::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
