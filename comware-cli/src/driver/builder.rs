//! Builder for SSH-backed sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use super::events::{EventSink, LogSink};
use super::session::{Session, SessionOptions};
use crate::error::{Error, Result};
use crate::platform::{PlatformDefinition, comware};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport};

/// Builder for connecting a [`Session`] over SSH.
///
/// # Example
///
/// ```rust,no_run
/// use comware_cli::SessionBuilder;
///
/// # async fn example() -> Result<(), comware_cli::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .connect()
///     .await?;
/// let config = session.get_config("current", &[], None).await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    options: SessionOptions,
    events: Arc<dyn EventSink>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            platform: None,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            options: SessionOptions::default(),
            events: Arc::new(LogSink),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Use a platform other than stock Comware.
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Connect timeout and per-command prompt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.options.pty.timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Cache responses until a configuration command is sent.
    pub fn single_user_mode(mut self, enabled: bool) -> Self {
        self.options.single_user_mode = enabled;
        self
    }

    /// Commands that invalidate the single-user-mode cache.
    pub fn config_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.config_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Where user-facing warnings go (default: the `log` facade).
    pub fn events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// The SSH configuration this builder would connect with.
    pub fn ssh_config(&self) -> Result<SshConfig> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| Error::invalid_argument("username is required"))?;
        let platform = self.platform.as_ref();

        let mut config = SshConfig::new(&self.host, username);
        config.port = self.port;
        config.auth = self.auth.clone();
        config.timeout = self.timeout;
        config.host_key_verification = self.host_key_verification.clone();
        config.known_hosts_path = self.known_hosts_path.clone();
        if let Some(platform) = platform {
            config.terminal_width = platform.terminal_width;
            config.terminal_height = platform.terminal_height;
        }
        Ok(config)
    }

    /// Connect, authenticate and open the session.
    pub async fn connect(self) -> Result<Session<SshTransport>> {
        let config = self.ssh_config()?;
        let transport = SshTransport::connect(config).await?;
        let platform = self.platform.unwrap_or_else(comware::platform);
        Session::open_with(transport, platform, self.options, self.events).await
    }
}
