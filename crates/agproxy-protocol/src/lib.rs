pub mod antigravity;
pub mod openai;
pub mod sse;
