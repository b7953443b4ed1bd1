#[tokio::main]
async fn main() {
    pool_calculator::start(std::env::args()).await;
}
