pub mod cache;
pub mod credential;
pub mod refresh;
pub mod rotation;

pub use cache::{CachedToken, FileTokenCache, MemoryTokenCache, TokenCache, EXPIRY_SKEW_SECS};
pub use credential::{load_accounts, AccountsError, Credential, CredentialConfig};
pub use refresh::{OauthConfig, OauthExchanger, RefreshError, TokenExchanger};
pub use rotation::RotationManager;
