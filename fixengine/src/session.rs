use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixVersion {
    Fix44,
    Fixt11,
}

impl FixVersion {
    pub fn as_begin_string(self) -> &'static str {
        match self {
            FixVersion::Fix44 => "FIX.4.4",
            FixVersion::Fixt11 => "FIXT.1.1",
        }
    }

    pub fn from_begin_string(s: &str) -> Option<Self> {
        match s {
            "FIX.4.4" => Some(FixVersion::Fix44),
            "FIXT.1.1" => Some(FixVersion::Fixt11),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    LogonSent,
    LoggedIn,
    LogoutSent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatAction {
    None,
    SendHeartbeat,
    SendTestRequest,
    ForceLogout,
}

/// Per-connection protocol state (spec §3 `FIX Session`). Sequence number
/// assignment and heartbeat bookkeeping are the only mutable surface;
/// actual socket I/O lives in the connection task that owns this struct,
/// so every method here runs on that task and is naturally serialized —
/// no internal locking is needed to satisfy the "strictly serialised
/// outbound messages" guarantee in spec §5.
#[derive(Clone, Debug)]
pub struct FixSession {
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub version: FixVersion,
    pub state: SessionState,
    pub out_seq_num: u32,
    pub in_seq_num: u32,
    pub last_heartbeat_sent_ms: i64,
    pub last_heartbeat_received_ms: i64,
    pub heartbeat_interval_s: u32,
    pub connection_handle: Option<Uuid>,
    pub resynchronizing: bool,
}

impl FixSession {
    pub fn new(sender_comp_id: impl Into<String>, target_comp_id: impl Into<String>, version: FixVersion) -> Self {
        Self {
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            version,
            state: SessionState::Disconnected,
            out_seq_num: 1,
            in_seq_num: 0,
            last_heartbeat_sent_ms: 0,
            last_heartbeat_received_ms: 0,
            heartbeat_interval_s: 30,
            connection_handle: None,
            resynchronizing: false,
        }
    }

    pub fn on_accept(&mut self, handle: Uuid) {
        self.connection_handle = Some(handle);
    }

    pub fn on_logon(&mut self, reset_seq_num: bool, heartbeat_interval_s: u32, now_ms: i64) {
        if reset_seq_num {
            self.out_seq_num = 1;
            self.in_seq_num = 1;
        }
        self.heartbeat_interval_s = heartbeat_interval_s;
        self.state = SessionState::LoggedIn;
        self.last_heartbeat_sent_ms = now_ms;
        self.last_heartbeat_received_ms = now_ms;
    }

    pub fn on_logout(&mut self) {
        self.state = SessionState::Disconnected;
        self.connection_handle = None;
    }

    /// Assigns the session's next `MsgSeqNum` atomically with respect to
    /// the caller's single-threaded write path (spec §5).
    pub fn next_out_seq(&mut self) -> u32 {
        let seq = self.out_seq_num;
        self.out_seq_num += 1;
        seq
    }

    /// Enforces `msgSeqNum == in-seq-num + 1`. Returns the expected
    /// sequence number as an error when a gap is detected; the caller
    /// must then send a ResendRequest and leave `in_seq_num` untouched.
    pub fn record_inbound(&mut self, seq: u32, now_ms: i64) -> Result<(), u32> {
        self.last_heartbeat_received_ms = now_ms;
        let expected = self.in_seq_num + 1;
        if seq == expected {
            self.in_seq_num = seq;
            self.resynchronizing = false;
            Ok(())
        } else {
            self.resynchronizing = true;
            Err(expected)
        }
    }

    /// Heartbeat/TestRequest/forced-Logout escalation (spec §4.3):
    /// silence past one interval -> Heartbeat, past two -> TestRequest,
    /// past three -> ForceLogout.
    pub fn heartbeat_tick(&mut self, now_ms: i64) -> HeartbeatAction {
        if self.state != SessionState::LoggedIn {
            return HeartbeatAction::None;
        }
        let interval_ms = i64::from(self.heartbeat_interval_s) * 1_000;
        if interval_ms == 0 {
            return HeartbeatAction::None;
        }
        let silence = now_ms - self.last_heartbeat_received_ms;

        if silence > 3 * interval_ms {
            return HeartbeatAction::ForceLogout;
        }
        if silence > 2 * interval_ms {
            return HeartbeatAction::SendTestRequest;
        }
        if now_ms - self.last_heartbeat_sent_ms > interval_ms {
            self.last_heartbeat_sent_ms = now_ms;
            return HeartbeatAction::SendHeartbeat;
        }
        HeartbeatAction::None
    }
}
