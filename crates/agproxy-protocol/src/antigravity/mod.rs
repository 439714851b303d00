pub mod request;
pub mod response;
pub mod types;

pub use request::{
    AssistantRequest, FunctionCallingConfig, FunctionDeclaration, GenerateAssistantRequest,
    GenerationConfig, ThinkingConfig, ToolConfig, ToolDeclarations,
};
pub use response::{Candidate, CandidateContent, ModelsResponse, ResponseBody, StreamGenerateResponse};
pub use types::{Content, ContentRole, FunctionCall, FunctionResponse, InlineData, Part};
