pub mod antigravity2openai;
