use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use vidtube::auth::{BcryptHasher, SessionManager};
use vidtube::configuration::get_configuration;
use vidtube::startup::run;
use vidtube::store::PgCredentialStore;
use vidtube::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry("info");

    tracing::info!("Starting application");

    // 설정 로드
    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!("Configuration loaded successfully");

    // 데이터베이스 연결 풀 생성
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let store = PgCredentialStore::new(pool);
    store.migrate().await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    // 세션 매니저 구성
    let hasher = BcryptHasher::new(configuration.auth.password_hash_cost);
    let sessions = SessionManager::new(Arc::new(store), Arc::new(hasher), &configuration.auth)
        .map_err(|e| {
            tracing::error!("Invalid auth configuration: {}", e);
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Auth configuration error")
        })?;

    // 서버 주소 설정
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, sessions, configuration.auth)?.await
}
