use std::sync::OnceLock;

static SHARED_CLIENT: OnceLock<wreq::Client> = OnceLock::new();

/// Process-shared HTTP client, reused across requests and credentials.
pub fn shared_client() -> &'static wreq::Client {
    SHARED_CLIENT.get_or_init(wreq::Client::new)
}
