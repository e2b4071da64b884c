use clap::{Parser, Subcommand};
use reqwest::{Client, StatusCode};
use serde_json::json;
use verdict::ProductFeedback;
use verdict::server::{ErrorResponse, SubmitResponse};

#[derive(Parser, Debug)]
#[clap(name = "verdict-cli", version, about = "Client for the Verdict feedback API")]
struct Cli {
    /// Base URL of a running Verdict server
    #[clap(long, default_value = "http://127.0.0.1:5000")]
    server: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a review for a product
    Submit {
        product_id: String,
        rating: i64,
        /// Review text (remaining words are joined with spaces)
        text: Vec<String>,
    },
    /// Show every review and the tallies for a product
    Show {
        product_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Command::Submit { product_id, rating, text } => {
            perform_submit(&client, &base, &product_id, rating, &text.join(" ")).await
        }
        Command::Show { product_id } => perform_show(&client, &base, &product_id).await,
    };

    if let Err(e) = result {
        eprintln!("[\u{2717} Error] {}", e);
        std::process::exit(1);
    }
}

async fn perform_submit(
    client: &Client,
    base: &str,
    product_id: &str,
    rating: i64,
    text: &str,
) -> Result<(), String> {
    let res = client
    .post(format!("{}/api/feedback", base))
    .json(&json!({ "product_id": product_id, "rating": rating, "text": text }))
    .send()
    .await
    .map_err(|e| format!("Could not reach server at {}: {}", base, e))?;

    if res.status() != StatusCode::CREATED {
        return Err(read_error(res).await);
    }

    let body: SubmitResponse = res.json().await.map_err(|e| e.to_string())?;
    println!("[\u{2713}] {}", body.message);
    println!("    Sentiment: {}", body.analysis.sentiment);
    println!("    Themes:    {}", format_themes(&body.analysis.themes));
    Ok(())
}

async fn perform_show(client: &Client, base: &str, product_id: &str) -> Result<(), String> {
    let res = client
    .get(format!("{}/api/feedback/{}", base, urlencoding::encode(product_id)))
    .send()
    .await
    .map_err(|e| format!("Could not reach server at {}: {}", base, e))?;

    if !res.status().is_success() {
        return Err(read_error(res).await);
    }

    let feedback: ProductFeedback = res.json().await.map_err(|e| e.to_string())?;

    if feedback.reviews.is_empty() {
        println!("No reviews for '{}'.", product_id);
        return Ok(());
    }

    println!("\n--- {} ({} reviews) ---", product_id, feedback.reviews.len());
    for (i, review) in feedback.reviews.iter().enumerate() {
        println!(
            "{:>3}. [{}] {:<8} {}  ({})",
            i + 1,
            review.rating,
            review.sentiment,
            review.text,
            format_themes(&review.themes)
        );
    }

    println!("\nSentiment:");
    for (label, count) in &feedback.stats.sentiment {
        println!("    {:<10} {}", label, count);
    }
    if !feedback.stats.themes.is_empty() {
        println!("Themes:");
        for (theme, count) in &feedback.stats.themes {
            println!("    {:<10} {}", theme, count);
        }
    }
    Ok(())
}

async fn read_error(res: reqwest::Response) -> String {
    let status = res.status();
    match res.json::<ErrorResponse>().await {
        Ok(body) => format!("{} ({})", body.error, status),
        Err(_) => format!("Server returned {}", status),
    }
}

fn format_themes(themes: &[String]) -> String {
    if themes.is_empty() {
        "no themes".to_string()
    } else {
        themes.join(", ")
    }
}
