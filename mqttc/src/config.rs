use rand::Rng;

/// Default number of send-and-wait attempts before a sender operation
/// gives up with `AckErr`.
pub const DEFAULT_RETRY: u32 = 3;

/// Default rendezvous wait, in milliseconds, per attempt.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Connection parameters for a [`crate::Session`].
///
/// - `clean_session` is set to `true`
/// - `keep_alive` is set to 30 seconds
/// - `retry` is set to [`DEFAULT_RETRY`], `timeout_ms` to [`DEFAULT_TIMEOUT_MS`]
///
/// The rest of the options are `None`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    client_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    clean_session: bool,
    keep_alive: u16,
    retry: u32,
    timeout_ms: u64,
}

impl ClientConfig {
    pub fn new() -> ClientConfig {
        ClientConfig {
            client_id: None,
            username: None,
            password: None,
            clean_session: true,
            keep_alive: 30,
            retry: DEFAULT_RETRY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn set_client_id<S: Into<String>>(&mut self, client_id: S) -> &mut ClientConfig {
        self.client_id = Some(client_id.into());
        self
    }

    /// Fills in a random client id of the form `mqttc_<u32>` if none has
    /// been set yet.
    pub fn generate_client_id(&mut self) -> &mut ClientConfig {
        if self.client_id.is_none() {
            let id: u32 = rand::thread_rng().gen();
            self.client_id = Some(format!("mqttc_{}", id));
        }
        self
    }

    pub fn set_username<S: Into<String>>(&mut self, username: S) -> &mut ClientConfig {
        self.username = Some(username.into());
        self
    }

    pub fn set_password<S: Into<String>>(&mut self, password: S) -> &mut ClientConfig {
        self.password = Some(password.into());
        self
    }

    pub fn set_clean_session(&mut self, clean_session: bool) -> &mut ClientConfig {
        self.clean_session = clean_session;
        self
    }

    pub fn set_keep_alive(&mut self, secs: u16) -> &mut ClientConfig {
        self.keep_alive = secs;
        self
    }

    pub fn set_retry(&mut self, retry: u32) -> &mut ClientConfig {
        self.retry = retry;
        self
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u64) -> &mut ClientConfig {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn clean_session(&self) -> bool {
        self.clean_session
    }

    pub fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generate_client_id_only_fills_when_absent() {
        let mut config = ClientConfig::new();
        config.generate_client_id();
        let first = config.client_id().unwrap().to_string();
        config.generate_client_id();
        assert_eq!(config.client_id().unwrap(), first);
    }

    #[test]
    fn explicit_client_id_is_not_overwritten() {
        let mut config = ClientConfig::new();
        config.set_client_id("fixed");
        config.generate_client_id();
        assert_eq!(config.client_id(), Some("fixed"));
    }
}
