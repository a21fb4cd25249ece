use std::time::Duration;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod session;
mod state;
#[cfg(test)]
mod test_support;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "user_accounts=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    app::spawn_session_pruner(&app_state, Duration::from_secs(15 * 60));

    let router = app::build_app(app_state.clone());
    app::serve(router, &app_state).await?;

    Ok(())
}
