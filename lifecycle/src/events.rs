#[derive(Clone, Debug)]
pub enum LifecycleEvent {
    QuoteGenerated { quote_id: String, request_id: String },
    QuoteAccepted { quote_id: String },
    QuoteRejected { quote_id: String, reason: String },
    QuoteExpired { quote_id: String },
    QuoteCancelled { quote_id: String },
    TradeExecuted { trade_id: String, quote_id: String },
    QuoteFailed { quote_id: String, reason: String },
}
