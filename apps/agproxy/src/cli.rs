use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "agproxy", about = "OpenAI-compatible proxy for the Antigravity API")]
pub struct Cli {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 3001)]
    pub port: u16,

    /// Bearer key callers must present. Validation is disabled when unset.
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Path to the accounts pool file.
    #[arg(long, default_value = "data/accounts.json")]
    pub accounts: String,

    /// Path to the durable token cache file.
    #[arg(long, default_value = "data/tokens.json")]
    pub token_cache: String,
}
