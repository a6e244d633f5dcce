use rand::Rng;

/// Greeting sent to every client before its username is read.
pub const DEFAULT_WELCOME: &str = "Welcome to Chat Room! Please enter your username:";

/// Where the server listens and how it greets new connections.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host or IP the listener binds to.
    pub host: String,
    /// Port to bind. `None` picks a random ephemeral port, retrying a
    /// couple of times if the pick happens to be taken.
    pub port: Option<u16>,
    /// Welcome text written to a client as soon as it connects.
    pub welcome: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            welcome: DEFAULT_WELCOME.to_string(),
        }
    }
}

/// Picks a port from the IANA ephemeral range.
pub(crate) fn random_port() -> u16 {
    rand::thread_rng().gen_range(49152..65535)
}
