use tracing::{Span, field};

/// Attach identifiers to the currently active span once they become known
/// (e.g. a quote-id allocated partway through handling a request).
pub fn annotate_span(quote_id: Option<&str>, session_id: Option<&uuid::Uuid>) {
    let span = Span::current();
    if let Some(qid) = quote_id {
        span.record("quote_id", &field::display(qid));
    }
    if let Some(sid) = session_id {
        span.record("session_id", &field::display(sid));
    }
}
