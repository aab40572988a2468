#[tokio::main]
async fn main() {
    if let Err(e) = exchange_reviews_be::start_server().await {
        eprintln!("Server failed: {}", e);
        std::process::exit(1);
    }
}
