use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};
use verdict::FeedbackDb;
use verdict::server::VerdictServer;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Product feedback tagging service", long_about = None)]
struct Args {
    /// Address the HTTP API binds to
    #[clap(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// JSON file holding every submitted review
    #[clap(long, default_value = "feedback_data.json")]
    data_file: PathBuf,

    /// Tokio worker threads (defaults to the number of logical cores)
    #[clap(long)]
    workers: Option<usize>,
}

fn main() {
    let args = Args::parse();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,verdict=info");
    }
    tracing_subscriber::fmt()
    .with_target(false)
    .with_level(true)
    .init();

    let workers = args
    .workers
    .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    .max(1);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
    .worker_threads(workers)
    .enable_all()
    .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args, workers)) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn async_main(args: Args, workers: usize) -> Result<(), warp::Error> {
    info!("--- Verdict Feedback Service ---");
    info!("Worker Threads: {}", workers);
    info!("Data File: {}", args.data_file.display());

    let db = Arc::new(FeedbackDb::open(&args.data_file));
    info!("Records in store: {}", db.len());

    let server = VerdictServer::new(db);
    server.run(args.addr, shutdown_signal()).await?;

    info!("Shutting down.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
