use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::FixConfig;
use common::logger::{TraceId, annotate_span, root_span};
use common::time::Clock;
use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::app::{FixApplication, PendingOutbound};
use crate::framing::FrameBuffer;
use crate::message::{build_message, parse_message};
use crate::session::{FixSession, FixVersion, HeartbeatAction, SessionState};
use crate::timestamp::format_sending_time;

trait DuplexStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> DuplexStream for T {}

/// Read-mostly registry of live sessions, protected by one lock (spec
/// §5 "Session table"). Keyed by the per-connection handle, not the
/// counterparty id, so `maxSessions` counts raw TCP connections.
#[derive(Default)]
struct SessionTable {
    sessions: parking_lot::RwLock<HashMap<Uuid, Arc<SyncMutex<FixSession>>>>,
}

impl SessionTable {
    fn len(&self) -> usize {
        self.sessions.read().len()
    }

    fn insert(&self, id: Uuid, session: Arc<SyncMutex<FixSession>>) {
        self.sessions.write().insert(id, session);
    }

    fn remove(&self, id: &Uuid) {
        self.sessions.write().remove(id);
    }
}

/// TCP/TLS acceptor for the FIX session engine (spec §4.3 "Connection
/// acceptance"). One task per accepted connection; a shared
/// [`FixApplication`] handles the message-routing concern.
pub struct FixAcceptor {
    cfg: FixConfig,
    app: Arc<FixApplication>,
    clock: Arc<dyn Clock>,
    sessions: Arc<SessionTable>,
    tls_acceptor: Option<tokio_native_tls::TlsAcceptor>,
}

impl FixAcceptor {
    pub fn new(cfg: FixConfig, app: Arc<FixApplication>, clock: Arc<dyn Clock>) -> Result<Self, common::BridgeError> {
        let tls_acceptor = match (&cfg.tls_cert_path, &cfg.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                let cert = std::fs::read(cert_path)
                    .map_err(|e| common::BridgeError::Configuration(format!("cannot read TLS cert {cert_path}: {e}")))?;
                let key = std::fs::read(key_path)
                    .map_err(|e| common::BridgeError::Configuration(format!("cannot read TLS key {key_path}: {e}")))?;
                let identity = native_tls::Identity::from_pkcs8(&cert, &key)
                    .map_err(|e| common::BridgeError::Configuration(format!("invalid TLS identity: {e}")))?;
                let acceptor = native_tls::TlsAcceptor::new(identity)
                    .map_err(|e| common::BridgeError::Configuration(format!("cannot build TLS acceptor: {e}")))?;
                Some(tokio_native_tls::TlsAcceptor::from(acceptor))
            }
            (None, None) => {
                tracing::warn!("fix.tls.cert-path/key-path not configured; accepting plaintext FIX connections");
                None
            }
            _ => {
                return Err(common::BridgeError::Configuration(
                    "fix.tls requires both cert-path and key-path, or neither".to_string(),
                ));
            }
        };

        Ok(Self {
            cfg,
            app,
            clock,
            sessions: Arc::new(SessionTable::default()),
            tls_acceptor,
        })
    }

    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), common::BridgeError> {
        let listener = TcpListener::bind((self.cfg.host.as_str(), self.cfg.port))
            .await
            .map_err(|e| common::BridgeError::Configuration(format!("cannot bind {}:{}: {e}", self.cfg.host, self.cfg.port)))?;

        tracing::info!(host = %self.cfg.host, port = self.cfg.port, "fix acceptor listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!(error = %e, "fix accept failed");
                            continue;
                        }
                    };
                    self.clone().admit(stream, addr.ip(), shutdown_rx.clone());
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("fix acceptor received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }

    fn admit(self: Arc<Self>, stream: TcpStream, ip: IpAddr, shutdown_rx: watch::Receiver<bool>) {
        let stripped = strip_ipv4_mapped(ip);

        if !self.cfg.allowed_ips.is_empty() && !self.cfg.allowed_ips.iter().any(|a| a == &stripped.to_string()) {
            tracing::warn!(ip = %stripped, "fix connection rejected: not in allow-list");
            return;
        }

        if self.sessions.len() >= self.cfg.max_sessions {
            tracing::warn!(ip = %stripped, max = self.cfg.max_sessions, "fix connection rejected: max sessions reached");
            return;
        }

        let handle_id = Uuid::new_v4();
        let span = root_span("fix_session", &TraceId::new(handle_id.to_string()));
        tokio::spawn(
            async move {
                if let Err(e) = self.clone().handle_connection(stream, handle_id, shutdown_rx).await {
                    tracing::warn!(error = %e, handle_id = %handle_id, "fix connection closed with error");
                }
                self.sessions.remove(&handle_id);
            }
            .instrument(span),
        );
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, handle_id: Uuid, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), common::BridgeError> {
        let mut boxed: Box<dyn DuplexStream> = match &self.tls_acceptor {
            Some(acceptor) => {
                let tls = acceptor
                    .accept(stream)
                    .await
                    .map_err(|e| common::BridgeError::SessionProtocol(format!("TLS handshake failed: {e}")))?;
                Box::new(tls)
            }
            None => Box::new(stream),
        };

        let session = Arc::new(SyncMutex::new(FixSession::new("", "", FixVersion::Fix44)));
        session.lock().on_accept(handle_id);
        self.sessions.insert(handle_id, session.clone());

        let mut framer = FrameBuffer::new();
        let mut read_buf = vec![0u8; 8192];
        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                n = boxed.read(&mut read_buf) => {
                    let n = n.map_err(|e| common::BridgeError::SessionProtocol(format!("read error: {e}")))?;
                    if n == 0 {
                        break; // peer closed
                    }
                    framer.push(&read_buf[..n]).map_err(|e| common::BridgeError::SessionProtocol(e.to_string()))?;

                    for raw in framer.drain_messages() {
                        if let Err(outcome) = self.process_inbound(&session, &raw, &mut boxed).await {
                            if outcome {
                                break; // logout processed, connection closing
                            }
                        }
                    }
                }
                _ = ticker.tick() => {
                    let action = session.lock().heartbeat_tick(self.clock.now_ms() as i64);
                    match action {
                        HeartbeatAction::SendHeartbeat => {
                            self.send(&session, &mut boxed, "0", Vec::new()).await?;
                        }
                        HeartbeatAction::SendTestRequest => {
                            self.send(&session, &mut boxed, "1", vec![(112, Uuid::new_v4().to_string())]).await?;
                        }
                        HeartbeatAction::ForceLogout => {
                            self.send(&session, &mut boxed, "5", Vec::new()).await?;
                            session.lock().on_logout();
                            break;
                        }
                        HeartbeatAction::None => {}
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        let _ = self.send(&session, &mut boxed, "5", Vec::new()).await;
                        session.lock().on_logout();
                        break;
                    }
                }
            }

            if session.lock().state == SessionState::Disconnected {
                break;
            }
        }

        Ok(())
    }

    /// Returns `Err(true)` when the caller's read loop should stop
    /// (Logout processed), `Err(false)` is never produced — `Ok(())`
    /// covers every message handled without terminating the connection.
    async fn process_inbound(
        &self,
        session: &Arc<SyncMutex<FixSession>>,
        raw: &[u8],
        stream: &mut Box<dyn DuplexStream>,
    ) -> Result<(), bool> {
        let msg = match parse_message(raw) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed or checksum-invalid fix message");
                return Ok(());
            }
        };

        let now = self.clock.now_ms() as i64;
        let seq = msg.seq_num().unwrap_or(0);
        let gap = session.lock().record_inbound(seq, now);
        if let Err(expected) = gap {
            let _ = self
                .send(session, stream, "2", vec![(7, expected.to_string()), (16, "0".to_string())])
                .await;
            return Ok(());
        }

        match msg.msg_type() {
            Some("A") => self.handle_logon(session, stream, &msg).await.map_err(|_| false)?,
            Some("1") => {
                let test_req_id = msg.get(112).unwrap_or_default().to_string();
                let _ = self.send(session, stream, "0", vec![(112, test_req_id)]).await;
            }
            Some("0") => {}
            Some("5") => {
                let _ = self.send(session, stream, "5", Vec::new()).await;
                session.lock().on_logout();
                return Err(true);
            }
            _ => {
                let counterparty_id = session.lock().sender_comp_id.clone();
                let outbound = self.app.dispatch(&counterparty_id, &msg).await;
                for pending in outbound {
                    let _ = self.send(session, stream, pending.msg_type, pending.fields).await;
                }
            }
        }

        Ok(())
    }

    async fn handle_logon(
        &self,
        session: &Arc<SyncMutex<FixSession>>,
        stream: &mut Box<dyn DuplexStream>,
        msg: &crate::message::FixMessage,
    ) -> Result<(), common::BridgeError> {
        let sender = msg.get(49).unwrap_or_default().to_string();
        let target = msg.get(56).unwrap_or_default().to_string();
        let heartbeat_s: u32 = msg.get(108).and_then(|v| v.parse().ok()).unwrap_or(30);
        let reset = msg.get(141) == Some("Y");

        if let Some(cp) = self.cfg.counterparties.get(&sender) {
            if cp.target_comp_id != target {
                return self
                    .send(session, stream, "3", vec![(58, "TargetCompID mismatch".to_string())])
                    .await;
            }
            if let (Some(expected), Some(got)) = (&cp.password, msg.get(554)) {
                if expected != got {
                    return self
                        .send(session, stream, "3", vec![(58, "invalid credentials".to_string())])
                        .await;
                }
            }
        }

        let handle_id = {
            let mut guard = session.lock();
            guard.sender_comp_id = sender;
            guard.target_comp_id = target;
            guard.on_logon(reset, heartbeat_s, self.clock.now_ms() as i64);
            guard.connection_handle
        };
        if let Some(handle_id) = handle_id {
            annotate_span(None, Some(&handle_id));
        }

        let mut fields = vec![(98, "0".to_string()), (108, heartbeat_s.to_string())];
        if reset {
            fields.push((141, "Y".to_string()));
        }
        self.send(session, stream, "A", fields).await
    }

    async fn send(
        &self,
        session: &Arc<SyncMutex<FixSession>>,
        stream: &mut Box<dyn DuplexStream>,
        msg_type: &str,
        mut fields: Vec<(u32, String)>,
    ) -> Result<(), common::BridgeError> {
        // our outbound SenderCompID is the counterparty's TargetCompID and vice versa
        let (begin_string, seq, our_id, their_id) = {
            let mut guard = session.lock();
            let seq = guard.next_out_seq();
            (
                guard.version.as_begin_string().to_string(),
                seq,
                guard.target_comp_id.clone(),
                guard.sender_comp_id.clone(),
            )
        };

        fields.push((34, seq.to_string()));
        fields.push((49, our_id));
        fields.push((56, their_id));
        fields.push((52, format_sending_time(Utc::now())));

        let bytes = build_message(&begin_string, msg_type, fields);
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| common::BridgeError::SessionProtocol(format!("write error: {e}")))
    }
}

fn strip_ipv4_mapped(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ipv4_mapped_addresses() {
        let mapped: IpAddr = "::ffff:192.168.1.1".parse().unwrap();
        assert_eq!(strip_ipv4_mapped(mapped).to_string(), "192.168.1.1");
    }
}
