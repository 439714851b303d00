pub mod antigravity2openai;
pub mod openai2antigravity;
