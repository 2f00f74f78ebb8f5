use std::sync::Arc;

use lifecycle::LifecycleEngine;
use ratecache::RateCache;
use serde_json::json;
use splitrouter::{AmmClient, OptimizeRequest};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use upstream::UpstreamClient;

/// Operator-facing inspection and control surface (spec §5 "Admin/health
/// interface"): one line in, one line of JSON out, closing the connection
/// after a single request/response. Modeled on `fixengine::acceptor`'s
/// accept loop, minus sessions and framing since every exchange here is a
/// single line.
pub struct AdminServer<U, A> {
    lifecycle: Arc<LifecycleEngine>,
    rate_cache: Arc<RateCache>,
    upstream: Arc<U>,
    amm: Arc<A>,
    min_split_bps: u32,
    chain_id: u64,
}

impl<U, A> AdminServer<U, A>
where
    U: UpstreamClient + 'static,
    A: AmmClient + 'static,
{
    pub fn new(lifecycle: Arc<LifecycleEngine>, rate_cache: Arc<RateCache>, upstream: Arc<U>, amm: Arc<A>, min_split_bps: u32, chain_id: u64) -> Self {
        Self {
            lifecycle,
            rate_cache,
            upstream,
            amm,
            min_split_bps,
            chain_id,
        }
    }

    pub async fn run(self: Arc<Self>, host: &str, port: u16, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind((host, port)).await?;
        tracing::info!(host, port, "admin interface listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _addr) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!(error = %e, "admin accept failed");
                            continue;
                        }
                    };
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.handle(stream).await {
                            tracing::debug!(error = %e, "admin connection closed with error");
                        }
                    });
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("admin interface received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle(&self, stream: tokio::net::TcpStream) -> std::io::Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };

        let response = self.dispatch(line.trim()).await;
        write_half.write_all(response.to_string().as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        Ok(())
    }

    async fn dispatch(&self, line: &str) -> serde_json::Value {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("health") => self.health(),
            Some("split") => {
                let (Some(src), Some(dst), Some(amount)) = (parts.next(), parts.next(), parts.next().and_then(|v| v.parse::<u128>().ok())) else {
                    return json!({"error": "usage: split <src> <dst> <amount>"});
                };
                self.split(src, dst, amount).await
            }
            _ => json!({"error": "unknown command", "commands": ["health", "split <src> <dst> <amount>"]}),
        }
    }

    fn health(&self) -> serde_json::Value {
        json!({
            "status": "ok",
            "rate_cache_entries": self.rate_cache.len(),
        })
    }

    async fn split(&self, src: &str, dst: &str, amount: u128) -> serde_json::Value {
        let req = OptimizeRequest {
            src_token: src.to_string(),
            dst_token: dst.to_string(),
            total_amount: amount,
            chain_id: self.chain_id,
        };
        match splitrouter::optimize(self.upstream.as_ref(), self.amm.as_ref(), &req, self.min_split_bps).await {
            Ok(result) => json!({
                "best_fraction": result.best_fraction,
                "net_output": result.net_output.to_string(),
                "improvement_bps": result.improvement_bps,
                "split_beneficial": result.split_beneficial,
            }),
            Err(e) => json!({"error": e}),
        }
    }

    #[allow(dead_code)]
    fn lifecycle(&self) -> &LifecycleEngine {
        &self.lifecycle
    }
}
