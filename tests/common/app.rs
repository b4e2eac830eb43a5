use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use crm_backend::auth::hash_password;
use crm_backend::config::{BootstrapAdminConfig, Config, RateLimitConfig, WorkerConfig};
use crm_backend::kpi::KpiEngine;
use crm_backend::routes::build_router;
use crm_backend::state::AppState;
use crm_backend::store::Store;

pub const ADMIN_EMAIL: &str = "admin@crm.local";
pub const ADMIN_PASSWORD: &str = "AdminPass1";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

async fn spawn_with_limits(api_limit: u64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("crm-test.sled");

    // Config is built directly instead of via set_var, so parallel test
    // binaries never race on process-wide environment variables.
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        jwt_secret: format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4()),
        jwt_expires_in_hours: 24,
        cors_origin: "http://localhost:3001".to_string(),
        trust_proxy: false,
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: api_limit,
        },
        worker: WorkerConfig {
            is_leader: false,
            enable_kpi_rollups: false,
        },
        bootstrap_admin: BootstrapAdminConfig {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let admin_hash = hash_password(ADMIN_PASSWORD).expect("hash admin password");
    store
        .bootstrap_admin(ADMIN_EMAIL, &admin_hash)
        .expect("seed bootstrap admin");

    let kpi_engine = Arc::new(KpiEngine::new(store.clone()));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store, kpi_engine, &config, shutdown_tx);

    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with_limits(500).await
}

pub async fn spawn_test_app_with_limit(api_limit: u64) -> TestApp {
    spawn_with_limits(api_limit).await
}
