#[tokio::main]
async fn main() {
    if let Err(err) = rc_api::run().await {
        tracing::error!(error = %err, "rc-api failed");
        std::process::exit(1);
    }
}
