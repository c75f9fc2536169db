// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use verdant_auth::{
    api::router,
    config::{AppConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    email::{DisabledDispatcher, EmailDispatcher, HttpEmailDispatcher},
    state::AppState,
    storage::{AuthDatabase, DATABASE_FILE},
    sweeper::ExpirySweeper,
};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_mailer(config: &AppConfig) -> Arc<dyn EmailDispatcher> {
    match &config.email {
        Some(email) => match HttpEmailDispatcher::new(email.clone()) {
            Ok(dispatcher) => {
                info!(url = %email.url, "Email dispatch via mail API");
                Arc::new(dispatcher)
            }
            Err(e) => {
                warn!(error = %e, "Mail API client unavailable; reset links will be logged");
                Arc::new(DisabledDispatcher)
            }
        },
        None => {
            warn!("EMAIL_API_URL not set; reset links will be logged");
            Arc::new(DisabledDispatcher)
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(?config, "Configuration loaded");

    let db_path = config.data_dir.join(DATABASE_FILE);
    let db = match AuthDatabase::open(&db_path) {
        Ok(db) => db,
        Err(e) => {
            error!(path = %db_path.display(), error = %e, "Failed to open auth database");
            return ExitCode::FAILURE;
        }
    };

    let mailer = build_mailer(&config);
    let state = AppState::new(config, db, mailer);

    if let Some(admin) = state.config.admin_bootstrap.clone() {
        match state.auth().bootstrap_admin(&admin.email, &admin.password).await {
            Ok(true) => info!(email = %admin.email, "Bootstrap admin created"),
            Ok(false) => info!("Bootstrap admin already present"),
            Err(e) => {
                error!(error = %e, "Failed to create bootstrap admin");
                return ExitCode::FAILURE;
            }
        }
    }

    let shutdown = CancellationToken::new();
    let sweeper = ExpirySweeper::new(state.db.clone(), state.config.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let bind = (state.config.host.clone(), state.config.port);
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(host = %bind.0, port = bind.1, error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Verdant auth server listening (docs at /docs)");
    }

    let app = router(state);
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await;

    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "Expiry sweeper task ended abnormally");
    }

    match served {
        Ok(()) => {
            info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
