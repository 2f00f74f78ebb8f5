mod admin;
mod stubs;

use std::sync::Arc;

use bridge::BridgeReconciler;
use common::config::BridgeConfig;
use common::time::{Clock, SystemClock};
use common::EventBus;
use journal::{AuditTrail, InMemoryJournal};
use lifecycle::{CounterpartyProfile, CounterpartyRegistry, LifecycleEngine};
use ratecache::{RateCache, RatePublisher};
use signer::Signer;
use tokio::sync::watch;
use upstream::auth::StaticToken;
use upstream::{HttpUpstreamClient, UpstreamClient};

use crate::admin::AdminServer;
use crate::stubs::{UnconfiguredAmm, UnconfiguredVenue};

const ADMIN_PORT: u16 = 9879;
const SHUTDOWN_DRAIN_MS: u64 = 2_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    common::logger::init_tracing("bridge-app", std::env::var("LOG_JSON").as_deref() == Ok("1"));

    let cfg = BridgeConfig::from_env();

    let signer_address = std::env::var("SIGNER_ADDRESS").unwrap_or_else(|_| "0x0000000000000000000000000000000000000000".to_string());
    let signer_key = std::env::var("SIGNER_KEY_MATERIAL").unwrap_or_else(|_| "dev-only-key-material".to_string());
    let node_signer = signer::InMemorySigner::new(signer_address, signer_key);
    let identity_sig = node_signer.sign_message(b"bridge-app/startup").await?;
    tracing::info!(address = node_signer.address(), signature = %identity_sig, "node identity established");

    let auth = Arc::new(StaticToken(cfg.upstream.auth_token.clone()));
    let upstream_client = Arc::new(HttpUpstreamClient::new(&cfg.upstream, auth));

    let journal = Arc::new(InMemoryJournal::default());
    let audit = Arc::new(AuditTrail::new(journal.clone() as Arc<dyn journal::Journal>));

    let registry = Arc::new(CounterpartyRegistry::new());
    for (sender_comp_id, _profile) in &cfg.fix.counterparties {
        registry.upsert(
            sender_comp_id.clone(),
            CounterpartyProfile {
                active: true,
                fee_rate_bps_override: None,
                enabled_pairs: None,
            },
        );
    }

    let sys_clock = Arc::new(SystemClock);
    let lifecycle_bus = Arc::new(EventBus::new());
    let lifecycle_engine = Arc::new(LifecycleEngine::new(
        upstream_client.clone() as Arc<dyn UpstreamClient>,
        sys_clock.clone() as Arc<dyn Clock>,
        cfg.lifecycle.clone(),
        registry,
        audit,
        lifecycle_bus,
    ));

    let rate_bus = Arc::new(EventBus::new());
    let rate_cache = Arc::new(RateCache::new(rate_bus));
    let rate_publisher = Arc::new(RatePublisher::new(
        upstream_client.clone(),
        rate_cache.clone(),
        sys_clock.clone(),
        cfg.rate.clone(),
        cfg.upstream.chain_id,
    ));
    {
        let rate_publisher = rate_publisher.clone();
        tokio::spawn(async move { rate_publisher.run().await });
    }

    let fix_app = Arc::new(fixengine::FixApplication::new(
        lifecycle_engine.clone(),
        upstream_client.clone() as Arc<dyn UpstreamClient>,
        cfg.upstream.chain_id,
    ));
    let fix_acceptor = Arc::new(fixengine::FixAcceptor::new(cfg.fix.clone(), fix_app, sys_clock.clone() as Arc<dyn Clock>)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    {
        let fix_acceptor = fix_acceptor.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = fix_acceptor.run(shutdown_rx).await {
                tracing::error!(error = %e, "fix acceptor exited");
            }
        });
    }

    // No downstream order-book venue or AMM router is wired in this
    // deployment; the bridge reconciler and split router still run so
    // their loops, metrics, and the admin interface are exercised end to
    // end, but every live order/swap attempt surfaces as a venue error
    // until a real `DownstreamVenue`/`AmmClient` is configured.
    let venue = Arc::new(UnconfiguredVenue);
    let amm = Arc::new(UnconfiguredAmm);
    let bridge_bus = Arc::new(EventBus::new());
    let reconciler = Arc::new(BridgeReconciler::new(
        upstream_client.clone(),
        venue,
        sys_clock.clone(),
        cfg.order_book_bridge.clone(),
        cfg.upstream.chain_id,
        Vec::new(), // mapping list is supplied by deployment-specific config, not yet surfaced in BridgeConfig
        bridge_bus,
    ));
    {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.run().await });
    }

    let admin = Arc::new(AdminServer::new(
        lifecycle_engine,
        rate_cache,
        upstream_client,
        amm,
        cfg.split.min_split_bps,
        cfg.upstream.chain_id,
    ));
    {
        let admin = admin.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = admin.run("127.0.0.1", ADMIN_PORT, shutdown_rx).await {
                tracing::error!(error = %e, "admin interface exited");
            }
        });
    }

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining");

    let _ = shutdown_tx.send(true);
    rate_publisher.stop();
    reconciler.stop();

    tokio::time::sleep(std::time::Duration::from_millis(SHUTDOWN_DRAIN_MS)).await;
    tracing::info!("shutdown complete");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
