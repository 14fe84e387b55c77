//! Per-user calculator session.
//!
//! The session is the only stateful piece: it owns the accumulated cap
//! edits between requests. Every user action arrives as a
//! SessionCommand and is answered with a SessionResponse; the
//! calculator itself is re-run from scratch on each Estimate.

use crate::{
    auth::Credentials,
    calculator,
    config::CalculatorConfig,
    error::{IcfError, IcfResult},
    impact::Estimate,
    schedule::{apply_cap_edits, CapEdits, CapSchedule, CapScheduleEntry},
    types::{Category, SessionId, TransactionFlow},
};
use serde::{Deserialize, Serialize};

/// All user-issued commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    Login { username: String, password: String },
    GetSchedule,
    SetCap { category: Category, percent: f64 },
    Reset,
    Estimate,
}

impl SessionCommand {
    /// Whether answering this command reads flows and the cap schedule.
    pub fn needs_market_data(&self) -> bool {
        matches!(self, SessionCommand::GetSchedule | SessionCommand::Estimate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionResponse {
    LoggedIn { username: String },
    LoginRejected,
    Schedule { entries: Vec<CapScheduleEntry> },
    CapRecorded { category: Category, percent: f64 },
    ResetDone,
    Estimate { estimate: Estimate },
}

pub struct CalculatorSession {
    pub session_id: SessionId,
    config:         CalculatorConfig,
    credentials:    Credentials,
    user:           Option<String>,
    edits:          CapEdits,
}

impl CalculatorSession {
    pub fn new(config: CalculatorConfig, credentials: Credentials) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            config,
            credentials,
            user: None,
            edits: CapEdits::new(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn edits(&self) -> &CapEdits {
        &self.edits
    }

    pub fn login(&mut self, username: &str, password: &str) -> bool {
        if self.credentials.verify(username, password) {
            log::info!("session={} login: {username}", self.session_id);
            self.user = Some(username.to_string());
            true
        } else {
            log::warn!("session={} login rejected for {username}", self.session_id);
            self.user = None;
            false
        }
    }

    /// Validate and record one proposed cap. Out-of-range, off-grid or
    /// non-finite values are rejected here; the calculator never sees them.
    pub fn set_cap(&mut self, category: Category, percent: f64) -> IcfResult<()> {
        self.require_login()?;
        self.config
            .cap_bounds
            .check(percent)
            .map_err(|reason| IcfError::InvalidCap { category, value: percent, reason })?;
        log::debug!("session={} caps: {category} -> {percent:.1}%", self.session_id);
        self.edits.set(category, percent);
        Ok(())
    }

    pub fn reset(&mut self) {
        log::debug!("session={} caps: reset {} edits", self.session_id, self.edits.len());
        self.edits.clear();
    }

    /// The base schedule with this session's edits applied.
    pub fn schedule(&self, base: &CapSchedule) -> CapSchedule {
        apply_cap_edits(base, &self.edits)
    }

    pub fn estimate(&self, flows: &[TransactionFlow], base: &CapSchedule) -> IcfResult<Estimate> {
        self.require_login()?;
        calculator::estimate(flows, base, &self.edits)
    }

    fn require_login(&self) -> IcfResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(IcfError::NotAuthenticated)
        }
    }

    pub fn handle(
        &mut self,
        command: SessionCommand,
        flows: &[TransactionFlow],
        base: &CapSchedule,
    ) -> IcfResult<SessionResponse> {
        match command {
            SessionCommand::Login { username, password } => {
                Ok(if self.login(&username, &password) {
                    SessionResponse::LoggedIn { username }
                } else {
                    SessionResponse::LoginRejected
                })
            }
            _ if !self.is_authenticated() => Err(IcfError::NotAuthenticated),
            SessionCommand::GetSchedule => Ok(SessionResponse::Schedule {
                entries: self.schedule(base).entries().cloned().collect(),
            }),
            SessionCommand::SetCap { category, percent } => {
                self.set_cap(category, percent)?;
                Ok(SessionResponse::CapRecorded { category, percent })
            }
            SessionCommand::Reset => {
                self.reset();
                Ok(SessionResponse::ResetDone)
            }
            SessionCommand::Estimate => Ok(SessionResponse::Estimate {
                estimate: self.estimate(flows, base)?,
            }),
        }
    }
}
