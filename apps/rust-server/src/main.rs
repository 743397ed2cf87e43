// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trust_server::{
    api::router,
    auth::{roles::SEEDED_ROLES, TokenCodec},
    blockchain::OfferFactoryClient,
    config::{AppConfig, LOG_FORMAT_ENV},
    notify::TracingMailer,
    role_sync::RoleReconciler,
    state::AppState,
    storage::UserDatabase,
};

/// Time given to in-flight requests once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;

    let db = UserDatabase::open(&config.user_db_path())
        .with_context(|| format!("opening {}", config.user_db_path().display()))?;
    db.seed_roles(&SEEDED_ROLES)?;
    let db = Arc::new(db);
    tracing::info!(path = %config.user_db_path().display(), "User database ready");

    let state = AppState::new(
        db.clone(),
        TokenCodec::new(config.jwt_secret.as_bytes()),
        Arc::new(TracingMailer),
        config.frontend_url.clone(),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_shutdown_signals(shutdown.clone()));

    let reconciler = match &config.offer_factory_address {
        Some(address) => {
            let client = OfferFactoryClient::new(&config.rpc_url, address)?;
            match client.get_block_number().await {
                Ok(block) => tracing::info!(
                    contract = %client.contract_address(),
                    block,
                    "Connected to ledger"
                ),
                Err(e) => tracing::warn!(error = %e, "Ledger unreachable at startup"),
            }
            let reconciler = RoleReconciler::new(db, Arc::new(client))
                .with_query_timeout(config.ledger_timeout)
                .with_interval(config.role_sync_interval);
            Some(tokio::spawn(reconciler.run(shutdown.clone())))
        }
        None => {
            tracing::info!("OFFER_FACTORY_ADDRESS not set, role reconciliation disabled");
            None
        }
    };

    let app = router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                tracing::debug!("rustls crypto provider already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .context("loading TLS certificate and key")?;

            let handle = axum_server::Handle::new();
            let signal = shutdown.clone();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                signal.cancelled().await;
                shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            tracing::info!(%addr, "Trust server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "Trust server listening on http (docs at /docs)");
            let signal = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await?;
        }
    }

    shutdown.cancel();
    if let Some(task) = reconciler {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Role reconciliation task ended abnormally");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` filter, `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Cancel `token` on ctrl-c or SIGTERM.
async fn watch_shutdown_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
