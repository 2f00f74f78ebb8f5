use std::sync::Arc;

use chrono::Utc;
use common::logger::annotate_span;
use lifecycle::{LifecycleEngine, SubmitRequest};
use upstream::{Side, UpstreamClient};
use uuid::Uuid;

use crate::message::FixMessage;
use crate::timestamp::format_sending_time;

/// An outbound message's body tags, not yet stamped with MsgSeqNum or
/// SendingTime — the connection task owns that, since it must happen
/// atomically with the socket write (spec §5).
#[derive(Clone, Debug)]
pub struct PendingOutbound {
    pub msg_type: &'static str,
    pub fields: Vec<(u32, String)>,
}

/// Dispatches inbound application-layer messages to the Quote Lifecycle
/// Engine and the upstream client (spec §4.3 "Application layer
/// routing"). One instance is shared across all sessions on the
/// acceptor; it holds no per-session state itself.
pub struct FixApplication {
    lifecycle: Arc<LifecycleEngine>,
    upstream: Arc<dyn UpstreamClient>,
    chain_id: u64,
}

impl FixApplication {
    pub fn new(lifecycle: Arc<LifecycleEngine>, upstream: Arc<dyn UpstreamClient>, chain_id: u64) -> Self {
        Self {
            lifecycle,
            upstream,
            chain_id,
        }
    }

    pub async fn dispatch(&self, counterparty_id: &str, msg: &FixMessage) -> Vec<PendingOutbound> {
        match msg.msg_type() {
            Some("R") => self.handle_quote_request(counterparty_id, msg).await,
            Some("D") => self.handle_new_order_single(msg).await,
            Some("Z") => {
                self.handle_quote_cancel(msg);
                Vec::new()
            }
            Some("x") => self.handle_security_list_request(msg).await,
            _ => vec![business_reject(msg, "3", "Unsupported Message Type")],
        }
    }

    async fn handle_quote_request(&self, counterparty_id: &str, msg: &FixMessage) -> Vec<PendingOutbound> {
        let quote_req_id = msg.get(131).unwrap_or_default().to_string();

        let Some((base, quote)) = parse_symbol(msg.get(55)) else {
            return vec![reject(msg, "symbol (55) missing or malformed")];
        };
        let Some(side) = msg.get(54).and_then(parse_side) else {
            return vec![reject(msg, "side (54) missing or unrecognised")];
        };
        let Some(quantity) = msg.get(38).and_then(|v| v.parse::<u128>().ok()) else {
            return vec![reject(msg, "orderQty (38) missing or not a valid integer")];
        };

        let result = self
            .lifecycle
            .submit(SubmitRequest {
                request_id: quote_req_id.clone(),
                counterparty_id: counterparty_id.to_string(),
                base_token: base.clone(),
                quote_token: quote.clone(),
                side,
                quantity,
                chain_id: self.chain_id,
            })
            .await;

        match result {
            Ok(q) => {
                annotate_span(Some(&q.quote_id), None);
                let symbol = format!("{base}/{quote}");
                let now = format_sending_time(Utc::now());
                let valid_until = format_sending_time(chrono::DateTime::from_timestamp_millis(q.expires_at_ms).unwrap_or_else(Utc::now));
                let price = q.price.to_string();

                let mut fields = vec![
                    (131, quote_req_id),
                    (117, q.quote_id.clone()),
                    (55, symbol),
                    (60, now),
                    (62, valid_until),
                    (537, "1".to_string()),
                ];
                match side {
                    Side::Buy => fields.push((133, price)),
                    Side::Sell => fields.push((132, price)),
                }

                vec![PendingOutbound { msg_type: "S", fields }]
            }
            Err(e) => vec![reject(msg, &e.to_string())],
        }
    }

    async fn handle_new_order_single(&self, msg: &FixMessage) -> Vec<PendingOutbound> {
        let cl_ord_id = msg.get(11).unwrap_or_default().to_string();
        let Some(quote_id) = msg.get(117) else {
            return vec![execution_report_rejected(&cl_ord_id, "firm-only orders not supported")];
        };

        match self.lifecycle.accept(quote_id).await {
            Ok(trade) => vec![PendingOutbound {
                msg_type: "8",
                fields: vec![
                    (11, cl_ord_id),
                    (17, Uuid::new_v4().to_string()),
                    (37, trade.trade_id),
                    (39, "2".to_string()), // ordStatus = Filled
                    (150, "F".to_string()), // execType = Trade
                    (6, trade.price.to_string()),
                    (14, trade.quantity.to_string()),
                    (151, "0".to_string()),
                ],
            }],
            Err(e) => vec![execution_report_rejected(&cl_ord_id, &e.to_string())],
        }
    }

    fn handle_quote_cancel(&self, msg: &FixMessage) {
        if let Some(quote_id) = msg.get(117) {
            if let Err(e) = self.lifecycle.cancel_quote(quote_id) {
                tracing::debug!(quote_id, error = %e, "quote cancel had no effect");
            }
        }
    }

    async fn handle_security_list_request(&self, msg: &FixMessage) -> Vec<PendingOutbound> {
        match self.upstream.list_pairs(self.chain_id).await {
            Ok(pairs) => {
                let mut fields = vec![(146, pairs.len().to_string())];
                for p in &pairs {
                    fields.push((55, format!("{}/{}", p.base_token, p.quote_token)));
                }
                vec![PendingOutbound { msg_type: "y", fields }]
            }
            Err(e) => vec![reject(msg, &e.to_string())],
        }
    }
}

fn parse_symbol(raw: Option<&str>) -> Option<(String, String)> {
    let s = raw?;
    let (base, quote) = s.split_once('/')?;
    Some((base.to_string(), quote.to_string()))
}

fn parse_side(v: &str) -> Option<Side> {
    match v {
        "1" => Some(Side::Buy),
        "2" => Some(Side::Sell),
        _ => None,
    }
}

fn reject(msg: &FixMessage, text: &str) -> PendingOutbound {
    PendingOutbound {
        msg_type: "3",
        fields: vec![
            (45, msg.seq_num().map(|s| s.to_string()).unwrap_or_default()),
            (372, msg.msg_type().unwrap_or_default().to_string()),
            (58, text.to_string()),
        ],
    }
}

fn business_reject(msg: &FixMessage, reason: &str, text: &str) -> PendingOutbound {
    PendingOutbound {
        msg_type: "j",
        fields: vec![
            (45, msg.seq_num().map(|s| s.to_string()).unwrap_or_default()),
            (372, msg.msg_type().unwrap_or_default().to_string()),
            (380, reason.to_string()),
            (58, text.to_string()),
        ],
    }
}

fn execution_report_rejected(cl_ord_id: &str, text: &str) -> PendingOutbound {
    PendingOutbound {
        msg_type: "8",
        fields: vec![
            (11, cl_ord_id.to_string()),
            (17, Uuid::new_v4().to_string()),
            (39, "8".to_string()), // ordStatus = Rejected
            (150, "8".to_string()),
            (58, text.to_string()),
        ],
    }
}
