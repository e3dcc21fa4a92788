//! Session façade: the operations callers use against one device.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::events::{EventSink, LogSink};
use super::privilege::ModeController;
use super::response::Response;
use crate::channel::{Interaction, PtyChannel, PtyConfig, SendOptions};
use crate::error::{Error, ErrorKind, Result};
use crate::facts::{self, Resource};
use crate::platform::{PlatformDefinition, comware};
use crate::template::Record;
use crate::transport::Transport;

static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"System image version: (\S+)").unwrap());
static MODEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^BOARD TYPE:\s+(.+?)\s*$").unwrap());
static HOSTNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^DEVICE_NAME\s*: (.+?)\s*$").unwrap());

/// Session behavior options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Cache `get` responses until a configuration command invalidates them.
    pub single_user_mode: bool,

    /// Most responses the cache holds; the oldest entry is evicted first.
    pub cache_limit: usize,

    /// Commands that change device configuration. Sending one drops the
    /// response cache.
    pub config_commands: Vec<String>,

    /// Channel timing and buffering.
    pub pty: PtyConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            single_user_mode: false,
            cache_limit: 256,
            config_commands: Vec::new(),
            pty: PtyConfig::default(),
        }
    }
}

/// Snapshot of what the session knows about the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// The last prompt the device printed, `None` once disconnected.
    pub current_prompt: Option<String>,

    /// Derived from `current_prompt`.
    pub in_config_mode: bool,

    /// Set once a configuration command invalidated the response cache.
    pub config_commands_cache_dirty: bool,
}

/// Where `get_config` reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Current,
    Saved,
}

impl ConfigSource {
    pub fn command(&self) -> &'static str {
        match self {
            ConfigSource::Current => "display current-configuration",
            ConfigSource::Saved => "display saved-configuration",
        }
    }
}

impl FromStr for ConfigSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "current" => Ok(ConfigSource::Current),
            "saved" => Ok(ConfigSource::Saved),
            other => Err(Error::invalid_argument(format!(
                "fetching configuration from {other} is not supported (use current or saved)"
            ))),
        }
    }
}

/// Options for [`Session::get`].
#[derive(Debug, Clone)]
pub struct GetOptions {
    /// Questions the command may ask, as regexes. Paired with `answer`.
    pub prompt: Vec<String>,

    /// Answers, one per prompt. A single answer applies to every prompt.
    pub answer: Vec<String>,

    /// Write the command without waiting for output.
    pub sendonly: bool,

    /// Output format. Only unset or empty is supported.
    pub output: Option<String>,

    /// Terminate the command with a newline.
    pub newline: bool,

    /// Require every prompt to be answered before completing.
    pub check_all: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            prompt: Vec::new(),
            answer: Vec::new(),
            sendonly: false,
            output: None,
            newline: true,
            check_all: false,
        }
    }
}

impl GetOptions {
    fn is_plain(&self) -> bool {
        self.prompt.is_empty() && !self.sendonly && self.newline
    }

    fn send_options(&self) -> Result<SendOptions> {
        if !self.answer.is_empty() && self.answer.len() != 1 && self.answer.len() != self.prompt.len() {
            return Err(Error::invalid_argument(
                "the number of answers must match the number of prompts",
            ));
        }
        let interactions = self
            .prompt
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                let answer = self
                    .answer
                    .get(i)
                    .or_else(|| self.answer.first())
                    .cloned()
                    .unwrap_or_default();
                Interaction::new(pattern, answer)
                    .map_err(|e| Error::invalid_argument(format!("invalid prompt '{pattern}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SendOptions {
            newline: self.newline,
            sendonly: self.sendonly,
            interactions,
            check_all: self.check_all,
        })
    }
}

/// Static facts about the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub network_os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_os_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_os_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_os_hostname: Option<String>,
}

/// What this session supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub rpc: Vec<String>,
    pub network_api: String,
    pub device_info: DeviceInfo,
    pub device_operations: DeviceOperations,
}

/// Device-side operations exposed through the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOperations {
    pub supports_onbox_diff: bool,
    pub supports_commit: bool,
    pub supports_rollback: bool,
    pub supports_multiline_delimiter: bool,
}

const RPC: &[&str] = &[
    "get_config",
    "edit_config",
    "get",
    "get_capabilities",
    "get_device_info",
    "run_commands",
    "gather_facts",
];

struct SessionInner<T> {
    channel: PtyChannel<T>,
    modes: ModeController,
    cache: IndexMap<String, Response>,
    cache_dirty: bool,
}

impl<T: Transport> SessionInner<T> {
    fn observe(&mut self) {
        self.modes
            .observe(self.channel.prompt(), self.channel.detector());
    }

    fn invalidate_cache(&mut self) {
        if !self.cache.is_empty() {
            debug!("dropping {} cached responses", self.cache.len());
        }
        self.cache.clear();
        self.cache_dirty = true;
    }

    /// Run one command, failing if the device rejects it.
    async fn exec(&mut self, command: &str, options: &SendOptions) -> Result<Response> {
        let result = self.channel.send_with(command, options).await;
        self.observe();
        result?.into_result()
    }
}

/// An open CLI session to a Comware device.
///
/// All operations take `&self` and run one at a time: the device terminal
/// is half-duplex, so concurrent callers queue on an internal lock that is
/// held for the whole operation, multi-command sequences included.
pub struct Session<T> {
    inner: Mutex<SessionInner<T>>,
    platform: PlatformDefinition,
    options: SessionOptions,
    events: Arc<dyn EventSink>,
}

impl<T: Transport> Session<T> {
    /// Open a Comware session over `transport`, reporting events to `log`.
    pub async fn open(transport: T, options: SessionOptions) -> Result<Self> {
        Self::open_with(transport, comware::platform(), options, Arc::new(LogSink)).await
    }

    /// Open a session with an explicit platform and event sink.
    ///
    /// Waits for the login prompt, runs the platform's on-open commands
    /// and, if the device starts in a configuration view, returns to user
    /// view.
    pub async fn open_with(
        transport: T,
        platform: PlatformDefinition,
        options: SessionOptions,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let mut channel = PtyChannel::new(transport, platform.terminal.clone(), options.pty.clone());
        let banner = channel.read_until_prompt().await?;
        info!("session open at prompt {}", banner.prompt);

        let mut inner = SessionInner {
            channel,
            modes: ModeController::from_platform(&platform),
            cache: IndexMap::new(),
            cache_dirty: false,
        };
        inner.observe();

        for on_open in &platform.on_open_commands {
            match inner.exec(&on_open.command, &SendOptions::default()).await {
                Ok(_) => {}
                Err(e) if !e.is_fatal() => {
                    debug!("on-open command '{}' failed: {}", on_open.command, e);
                    events.warn(&on_open.warning);
                }
                Err(e) => return Err(e),
            }
        }

        if inner.modes.in_config_mode() {
            inner.modes.exit_config(&mut inner.channel).await?;
        }

        Ok(Self {
            inner: Mutex::new(inner),
            platform,
            options,
            events,
        })
    }

    /// The platform this session was opened with.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        let inner = self.inner.lock().await;
        let current_prompt = inner.channel.prompt().map(str::to_string);
        SessionState {
            in_config_mode: current_prompt
                .as_deref()
                .is_some_and(|p| inner.channel.detector().is_config_prompt(p)),
            current_prompt,
            config_commands_cache_dirty: inner.cache_dirty,
        }
    }

    /// Fetch the device configuration. `source` is `current` or `saved`;
    /// `flags` are appended to the display command.
    pub async fn get_config(&self, source: &str, flags: &[&str], format: Option<&str>) -> Result<String> {
        let source = ConfigSource::from_str(source)?;
        if let Some(format) = format.filter(|f| !f.is_empty()) {
            return Err(Error::invalid_argument(format!(
                "'format' value {format} is not supported for get_config"
            )));
        }

        let command = format!("{} {}", source.command(), flags.join(" "));
        let mut inner = self.inner.lock().await;
        let response = self
            .get_locked(&mut inner, command.trim(), &GetOptions::default())
            .await?;
        Ok(response.result)
    }

    /// Apply configuration lines in system view.
    ///
    /// Stops at the first line the device rejects; the lines before it stay
    /// applied. The session leaves configuration mode either way.
    pub async fn edit_config<S: AsRef<str>>(&self, commands: &[S]) -> Result<Vec<Response>> {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        inner.invalidate_cache();

        inner.modes.enter_config(&mut inner.channel).await?;

        let mut responses = Vec::with_capacity(commands.len());
        let mut failure = None;
        for command in commands {
            match inner.exec(command.as_ref(), &SendOptions::default()).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure.take_if(|e| e.is_fatal()) {
            return Err(e);
        }

        let exited = inner.modes.exit_config(&mut inner.channel).await;
        match (failure, exited) {
            (Some(e), _) => Err(e),
            (None, Err(e)) => Err(e),
            (None, Ok(())) => Ok(responses),
        }
    }

    /// Run a command and return its output.
    pub async fn get(&self, command: &str, options: &GetOptions) -> Result<Response> {
        let mut inner = self.inner.lock().await;
        self.get_locked(&mut inner, command, options).await
    }

    /// Run commands in order, stopping at the first failure.
    pub async fn run_commands<S: AsRef<str>>(&self, commands: &[S]) -> Result<Vec<Response>> {
        let mut inner = self.inner.lock().await;
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            responses.push(
                self.get_locked(&mut inner, command.as_ref(), &GetOptions::default())
                    .await?,
            );
        }
        Ok(responses)
    }

    /// Identify the device.
    pub async fn get_device_info(&self) -> Result<DeviceInfo> {
        let mut inner = self.inner.lock().await;
        let plain = GetOptions::default();
        let version = self.get_locked(&mut inner, "display version", &plain).await?;
        let version = version.result.replace("\r\n", "\n");

        let manuinfo = self
            .get_locked(&mut inner, "display device manuinfo", &plain)
            .await?;
        let manuinfo = manuinfo.result.replace("\r\n", "\n");

        Ok(DeviceInfo {
            network_os: self.platform.name.clone(),
            network_os_version: capture(&VERSION, &version)
                .map(|v| v.trim_end_matches(',').to_string()),
            network_os_model: capture(&MODEL, &version).map(str::to_string),
            network_os_hostname: capture(&HOSTNAME, &manuinfo).map(str::to_string),
        })
    }

    /// Describe supported operations and the device.
    pub async fn get_capabilities(&self) -> Result<Capabilities> {
        Ok(Capabilities {
            rpc: RPC.iter().map(|s| s.to_string()).collect(),
            network_api: "cliconf".to_string(),
            device_info: self.get_device_info().await?,
            device_operations: DeviceOperations {
                supports_onbox_diff: false,
                supports_commit: false,
                supports_rollback: false,
                supports_multiline_delimiter: false,
            },
        })
    }

    /// Gather structured facts for each resource, keyed by resource name.
    ///
    /// Values of `no_log` fields are redacted.
    pub async fn gather_facts(&self, resources: &[Resource]) -> Result<Record> {
        let mut inner = self.inner.lock().await;
        let mut outputs: HashMap<&'static str, String> = HashMap::new();
        let mut facts = Record::new();

        for resource in resources {
            let command = resource.command();
            if !outputs.contains_key(command) {
                let response = self
                    .get_locked(&mut inner, command, &GetOptions::default())
                    .await?;
                outputs.insert(command, response.result);
            }
            let text = outputs.get(command).map(String::as_str).unwrap_or_default();
            let records = facts::parse_resource(*resource, text)?;
            debug!("gathered {} {} records", records.len(), resource);
            facts.insert(resource.name().to_string(), Value::Array(records));
        }
        Ok(facts)
    }

    /// Enter system view.
    pub async fn enter_config(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        inner.modes.enter_config(&mut inner.channel).await
    }

    /// Return to user view.
    pub async fn exit_config(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        inner.modes.exit_config(&mut inner.channel).await
    }

    /// Close the session. A lost connection is not an error here.
    pub async fn close(self) -> Result<()> {
        let mut inner = self.inner.into_inner();
        match inner.channel.close().await {
            Err(e) if e.kind() == ErrorKind::ConnectionLost => {
                self.events.warn(&format!("session already closed: {e}"));
                Ok(())
            }
            other => other,
        }
    }

    async fn get_locked(
        &self,
        inner: &mut SessionInner<T>,
        command: &str,
        options: &GetOptions,
    ) -> Result<Response> {
        if command.trim().is_empty() {
            return Err(Error::invalid_argument("must provide value of command to execute"));
        }
        if let Some(output) = options.output.as_deref().filter(|o| !o.is_empty()) {
            return Err(Error::invalid_argument(format!(
                "'output' value {output} is not supported for get"
            )));
        }
        let send = options.send_options()?;
        let cacheable = self.options.single_user_mode && options.is_plain();

        if self.is_config_command(command) {
            inner.invalidate_cache();
        } else if cacheable {
            if let Some(cached) = inner.cache.get(command) {
                debug!("cache hit for {:?}", command);
                return Ok(cached.clone());
            }
        }

        let response = inner.exec(command, &send).await?;
        if cacheable && !self.is_config_command(command) && self.options.cache_limit > 0 {
            if inner.cache.len() >= self.options.cache_limit {
                inner.cache.shift_remove_index(0);
            }
            inner.cache.insert(command.to_string(), response.clone());
        }
        Ok(response)
    }

    fn is_config_command(&self, command: &str) -> bool {
        let command = command.trim();
        self.options.config_commands.iter().any(|c| c.trim() == command)
    }
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::driver::events::testing::RecordingSink;
    use crate::transport::mock::MockTransport;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn options() -> SessionOptions {
        SessionOptions {
            pty: PtyConfig {
                timeout: Duration::from_millis(200),
                ..PtyConfig::default()
            },
            ..SessionOptions::default()
        }
    }

    fn device() -> MockTransport {
        MockTransport::new()
            .banner("\r\n******************************************************************************\r\n<SW-CORE-01>")
            .on("screen-length disable", &["screen-length disable\r\n<SW-CORE-01>"])
    }

    async fn open(mock: MockTransport, options: SessionOptions) -> Session<MockTransport> {
        Session::open(mock, options).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_disables_paging() {
        let mock = device();
        let sent = mock.sent_log();
        let session = open(mock, options()).await;

        assert_eq!(*sent.lock().unwrap(), vec!["screen-length disable"]);
        let state = session.state().await;
        assert_eq!(state.current_prompt.as_deref(), Some("<SW-CORE-01>"));
        assert!(!state.in_config_mode);
    }

    #[tokio::test]
    async fn test_open_warns_when_paging_cannot_be_disabled() {
        let mock = MockTransport::new().banner("<SW>").on(
            "screen-length disable",
            &["screen-length disable\r\n            ^\r\n % Unrecognized command found at '^' position.\r\n<SW>"],
        );
        let sink = RecordingSink::default();
        let warnings = sink.warnings.clone();

        let session = Session::open_with(mock, comware::platform(), options(), Arc::new(sink)).await;
        assert_ok!(session);
        assert_eq!(
            *warnings.lock().unwrap(),
            vec!["Unable to disable screen-length, command responses may be truncated"]
        );
    }

    #[tokio::test]
    async fn test_open_in_system_view_returns_to_user_view() {
        let mock = MockTransport::new()
            .banner("[SW]")
            .on("screen-length disable", &["screen-length disable\r\n[SW]"])
            .on("end", &["end\r\n<SW>"]);
        let session = open(mock, options()).await;
        assert!(!session.state().await.in_config_mode);
    }

    #[tokio::test]
    async fn test_enter_config() {
        let mock = device().on("system-view", &["system-view\r\nSystem View: return to User View with Ctrl+Z.\r\n[SW-CORE-01]"]);
        let session = open(mock, options()).await;

        assert_ok!(session.enter_config().await);
        let state = session.state().await;
        assert!(state.in_config_mode);
        assert_eq!(state.current_prompt.as_deref(), Some("[SW-CORE-01]"));
    }

    #[tokio::test]
    async fn test_enter_config_rejected() {
        let mock = device().on("system-view", &["system-view\r\n<SW-CORE-01>"]);
        let session = open(mock, options()).await;

        let err = session.enter_config().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrivilegeEscalationFailed);
        assert!(!session.state().await.in_config_mode);
    }

    #[tokio::test]
    async fn test_get_config_bad_source_sends_nothing() {
        let mock = device();
        let sent = mock.sent_log();
        let session = open(mock, options()).await;

        let err = session.get_config("bogus", &[], None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = session.get_config("current", &[], Some("json")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_config_with_flags() {
        let mock = device().on(
            "display current-configuration interface GigabitEthernet1/0/1",
            &["display current-configuration interface GigabitEthernet1/0/1\r\n#\r\ninterface GigabitEthernet1/0/1\r\n port link-mode bridge\r\n#\r\nreturn\r\n<SW-CORE-01>"],
        );
        let session = open(mock, options()).await;

        let config = session
            .get_config("current", &["interface", "GigabitEthernet1/0/1"], None)
            .await
            .unwrap();
        assert!(config.starts_with("#\ninterface GigabitEthernet1/0/1"));
        assert!(config.ends_with("return"));
    }

    #[tokio::test]
    async fn test_edit_config_stops_at_rejected_line() {
        let mock = device()
            .on("system-view", &["system-view\r\n[SW-CORE-01]"])
            .on("interface g1/0/1", &["interface g1/0/1\r\n[SW-CORE-01-GigabitEthernet1/0/1]"])
            .on(
                "shutdown",
                &["shutdown\r\n % Unrecognized command found at '^' position.\r\n", "[SW-CORE-01-GigabitEthernet1/0/1]"],
            )
            .on("end", &["end\r\n<SW-CORE-01>"]);
        let sent = mock.sent_log();
        let session = open(mock, options()).await;

        let err = session
            .edit_config(&["interface g1/0/1", "shutdown", "description never sent"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceRejected);
        assert_eq!(
            *sent.lock().unwrap(),
            vec!["screen-length disable", "system-view", "interface g1/0/1", "shutdown", "end"]
        );
        let state = session.state().await;
        assert!(!state.in_config_mode);
        assert!(state.config_commands_cache_dirty);
    }

    #[tokio::test]
    async fn test_edit_config() {
        let mock = device()
            .on("system-view", &["system-view\r\n[SW-CORE-01]"])
            .on("vlan 10", &["vlan 10\r\n[SW-CORE-01-vlan10]"])
            .on("name users", &["name users\r\n[SW-CORE-01-vlan10]"])
            .on("end", &["end\r\n<SW-CORE-01>"]);
        let session = open(mock, options()).await;

        let responses = session.edit_config(&["vlan 10", "name users"]).await.unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].prompt, "[SW-CORE-01-vlan10]");
        assert!(!session.state().await.in_config_mode);
    }

    #[tokio::test]
    async fn test_get_validates_arguments() {
        let session = open(device(), options()).await;
        assert_eq!(
            session.get("  ", &GetOptions::default()).await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let options = GetOptions {
            output: Some("json".into()),
            ..GetOptions::default()
        };
        assert_err!(session.get("display clock", &options).await);
    }

    #[tokio::test]
    async fn test_empty_format_and_output_accepted() {
        let mock = device()
            .on("display current-configuration", &["display current-configuration\r\n#\r\n sysname SW-CORE-01\r\n#\r\nreturn\r\n<SW-CORE-01>"])
            .on("display clock", &["display clock\r\n10:00:00 UTC\r\n<SW-CORE-01>"]);
        let session = open(mock, options()).await;

        let config = session.get_config("current", &[], Some("")).await.unwrap();
        assert!(config.ends_with("return"));

        let options = GetOptions {
            output: Some(String::new()),
            ..GetOptions::default()
        };
        let response = session.get("display clock", &options).await.unwrap();
        assert_eq!(response.result, "10:00:00 UTC");
    }

    #[tokio::test]
    async fn test_concurrent_gets_run_one_at_a_time() {
        let mock = device()
            .on("display clock", &["display clock\r\n10:00", ":00 UTC\r\n<SW-CORE-01>"])
            .on("display users", &["display users\r\n Line  User\r\n", "<SW-CORE-01>"]);
        let sent = mock.sent_log();
        let transcript = mock.transcript();
        let session = open(mock, options()).await;

        let plain = GetOptions::default();
        let (clock, users) = tokio::join!(
            session.get("display clock", &plain),
            session.get("display users", &plain)
        );
        let clock = clock.unwrap();
        let users = users.unwrap();
        assert_eq!(clock.result, "10:00:00 UTC");
        assert!(users.result.contains("Line  User"));
        assert!(!users.result.contains("UTC"));

        assert_eq!(sent.lock().unwrap()[1..].to_vec(), vec!["display clock", "display users"]);
        let transcript = transcript.lock().unwrap();
        let position = |entry: &str| transcript.iter().position(|e| e == entry).unwrap();
        assert!(position("< :00 UTC\r\n<SW-CORE-01>") < position("> display users"));
    }

    #[tokio::test]
    async fn test_get_answers_prompt() {
        let mock = device()
            .on("reset saved-configuration", &["reset saved-configuration\r\nThe saved configuration file will be erased. Are you sure? [Y/N]:"])
            .on("y", &["y\r\nConfiguration file in flash: is being cleared.\r\nPlease wait ...\r\n<SW-CORE-01>"]);
        let session = open(mock, options()).await;

        let options = GetOptions {
            prompt: vec![r"\[Y/N\]:".into()],
            answer: vec!["y".into()],
            ..GetOptions::default()
        };
        let response = session.get("reset saved-configuration", &options).await.unwrap();
        assert!(response.result.contains("being cleared"));
    }

    #[tokio::test]
    async fn test_get_rejected() {
        let mock = device().on(
            "display vlan 5000",
            &["display vlan 5000\r\n                    ^\r\n% Wrong parameter found at '^' position.\r\n<SW-CORE-01>"],
        );
        let session = open(mock, options()).await;
        let err = session.get("display vlan 5000", &GetOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceRejected);
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_connection_lost() {
        let session = open(device().on_eof("reboot"), options()).await;
        let err = session.get("reboot", &GetOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionLost);
        assert_eq!(session.state().await.current_prompt, None);
    }

    #[tokio::test]
    async fn test_timeout() {
        let session = open(device(), options()).await;
        let err = session.get("display logbuffer", &GetOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
    }

    #[tokio::test]
    async fn test_single_user_mode_cache() {
        let mock = device()
            .on("display clock", &["display clock\r\n10:00:00 UTC\r\n<SW-CORE-01>"])
            .on("save force", &["save force\r\nSaved.\r\n<SW-CORE-01>"])
            .on("display clock", &["display clock\r\n10:05:00 UTC\r\n<SW-CORE-01>"]);
        let sent = mock.sent_log();
        let options = SessionOptions {
            single_user_mode: true,
            config_commands: vec!["save force".into()],
            ..options()
        };
        let session = open(mock, options).await;

        let first = session.get("display clock", &GetOptions::default()).await.unwrap();
        let cached = session.get("display clock", &GetOptions::default()).await.unwrap();
        assert_eq!(first.result, cached.result);
        assert!(!session.state().await.config_commands_cache_dirty);

        session.get("save force", &GetOptions::default()).await.unwrap();
        assert!(session.state().await.config_commands_cache_dirty);

        let fresh = session.get("display clock", &GetOptions::default()).await.unwrap();
        assert_eq!(fresh.result, "10:05:00 UTC");
        assert_eq!(
            sent.lock().unwrap().iter().filter(|c| *c == "display clock").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_cache_evicts_oldest() {
        let mock = device()
            .on("display clock", &["display clock\r\n10:00:00 UTC\r\n<SW-CORE-01>"])
            .on("display users", &["display users\r\n Line  User\r\n<SW-CORE-01>"])
            .on("display clock", &["display clock\r\n10:05:00 UTC\r\n<SW-CORE-01>"]);
        let options = SessionOptions {
            single_user_mode: true,
            cache_limit: 1,
            ..options()
        };
        let session = open(mock, options).await;
        let plain = GetOptions::default();

        session.get("display clock", &plain).await.unwrap();
        session.get("display users", &plain).await.unwrap();
        let cached_users = session.get("display users", &plain).await.unwrap();
        assert!(cached_users.result.contains("Line  User"));

        let clock = session.get("display clock", &plain).await.unwrap();
        assert_eq!(clock.result, "10:05:00 UTC");
        assert_eq!(session.inner.lock().await.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_run_commands() {
        let mock = device()
            .on("display clock", &["display clock\r\n10:00:00 UTC\r\n<SW-CORE-01>"])
            .on("display bogus", &["display bogus\r\n % Unrecognized command found at '^' position.\r\n<SW-CORE-01>"]);
        let sent = mock.sent_log();
        let session = open(mock, options()).await;

        let err = session
            .run_commands(&["display clock", "display bogus", "display version"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceRejected);
        assert!(!sent.lock().unwrap().iter().any(|c| c == "display version"));
    }

    const VERSION_OUTPUT: &str = "display version\r\n\
HPE Comware Software, Version 7.1.070, Release 3506P06\r\n\
Copyright (c) 2010-2020 Hewlett Packard Enterprise Development LP\r\n\
HPE 5130-24G-4SFP+ EI Switch uptime is 0 weeks, 1 day, 2 hours, 3 minutes\r\n\
Last reboot reason : Cold reboot\r\n\
Boot image: flash:/5130ei-cmw710-boot-r3506p06.bin\r\n\
System image: flash:/5130ei-cmw710-system-r3506p06.bin\r\n\
System image version: 7.1.070, Release 3506P06\r\n\
\r\n\
Slot 1:\r\n\
Uptime is 0 weeks,1 day,2 hours,3 minutes\r\n\
BOARD TYPE:         HPE 5130-24G-4SFP+ EI Switch\r\n\
<SW-CORE-01>";

    const MANUINFO_OUTPUT: &str = "display device manuinfo\r\n\
Slot 1 CPU 0:\r\n\
DEVICE_NAME          : HPE 5130-24G-4SFP+ EI JG932A\r\n\
DEVICE_SERIAL_NUMBER : CN12345678\r\n\
MAC_ADDRESS          : 70BA-EF6A-6D8F\r\n\
MANUFACTURING_DATE   : 2019-01-01\r\n\
VENDOR_NAME          : HPE\r\n\
<SW-CORE-01>";

    #[tokio::test]
    async fn test_get_device_info() {
        let mock = device()
            .on("display version", &[VERSION_OUTPUT])
            .on("display device manuinfo", &[MANUINFO_OUTPUT]);
        let session = open(mock, options()).await;

        let info = session.get_device_info().await.unwrap();
        assert_eq!(
            info,
            DeviceInfo {
                network_os: "comware".into(),
                network_os_version: Some("7.1.070".into()),
                network_os_model: Some("HPE 5130-24G-4SFP+ EI Switch".into()),
                network_os_hostname: Some("HPE 5130-24G-4SFP+ EI JG932A".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_get_capabilities() {
        let mock = device()
            .on("display version", &["display version\r\n<SW-CORE-01>"])
            .on("display device manuinfo", &["display device manuinfo\r\n<SW-CORE-01>"]);
        let session = open(mock, options()).await;

        let caps = session.get_capabilities().await.unwrap();
        assert_eq!(caps.network_api, "cliconf");
        assert!(caps.rpc.iter().any(|r| r == "gather_facts"));
        assert_eq!(
            serde_json::to_value(&caps.device_info).unwrap(),
            json!({"network_os": "comware"})
        );
    }

    #[tokio::test]
    async fn test_gather_facts() {
        let config = "display current-configuration\r\n#\r\nlocal-user admin class manage\r\n password hash $h$6$abc\r\n service-type ssh\r\n#\r\ninterface GigabitEthernet1/0/1\r\n shutdown\r\n#\r\nreturn\r\n<SW-CORE-01>";
        let mock = device()
            .on("display device manuinfo", &[MANUINFO_OUTPUT])
            .on("display current-configuration", &[config]);
        let sent = mock.sent_log();
        let session = open(mock, options()).await;

        let facts = session.gather_facts(&Resource::ALL).await.unwrap();
        assert_eq!(facts["manuinfo"][0]["serial_number"], json!("CN12345678"));
        assert_eq!(
            facts["interfaces"],
            json!([{"name": "GigabitEthernet1/0/1", "enabled": false}])
        );
        assert_eq!(
            facts["local_users"],
            json!([{
                "name": "admin",
                "class": "manage",
                "password_format": "hash",
                "password": "VALUE_SPECIFIED_IN_NO_LOG_PARAMETER",
                "service_types": ["ssh"],
            }])
        );
        // One display per distinct command.
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_close() {
        let session = open(device(), options()).await;
        assert_ok!(session.close().await);
    }
}
