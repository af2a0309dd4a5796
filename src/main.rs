mod args;

use clap::Parser;

/// Start QRM
#[tokio::main]
async fn main() {
    let args = args::Args::parse();
    let conf = qrm::conf::Conf::new(&args.config).expect("Failed to load config");
    Box::pin(qrm::axum(conf)).await;
}
