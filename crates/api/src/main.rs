#[tokio::main]
async fn main() {
    supplymesh_observability::init();

    let services = match supplymesh_api::app::services::build_services() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to build services");
            std::process::exit(1);
        }
    };

    let app = supplymesh_api::app::build_app(std::sync::Arc::new(services));

    let listener = match tokio::net::TcpListener::bind("0.0.0.0:8080").await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind 0.0.0.0:8080");
            std::process::exit(1);
        }
    };

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on {addr}");
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited");
    }
}
