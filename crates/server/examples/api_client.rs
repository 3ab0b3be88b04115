//! Calls a running embedgate server over HTTP.
//!
//! Start the server first, e.g. with the stub provider:
//! `EMBEDGATE_PROVIDER_KIND=stub cargo run -p embedgate-server`

use reqwest::Client;
use serde_json::{json, Value};

const SERVER_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::new();

    println!("1. Health Check:");
    let resp = client.get(format!("{SERVER_URL}/health")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("2. Single Embedding:");
    let resp: Value = client
        .post(format!("{SERVER_URL}/embeddings/generate"))
        .json(&json!({ "text": "machine learning basics" }))
        .send()
        .await?
        .json()
        .await?;
    let dims = resp["embedding"].as_array().map_or(0, Vec::len);
    println!("Model: {}, dimension: {dims}", resp["model"]);
    println!();

    println!("3. Batch Embeddings:");
    let resp: Value = client
        .post(format!("{SERVER_URL}/embeddings/generate"))
        .json(&json!({ "texts": ["deep learning intro", "cooking recipes"] }))
        .send()
        .await?
        .json()
        .await?;
    let count = resp["embeddings"].as_array().map_or(0, Vec::len);
    println!("Embeddings returned: {count}");
    println!();

    println!("4. Similarity Ranking:");
    let resp: Value = client
        .post(format!("{SERVER_URL}/embeddings/similarity"))
        .json(&json!({
            "query": "machine learning basics",
            "candidates": ["deep learning intro", "cooking recipes", "neural networks"],
            "threshold": 0.5
        }))
        .send()
        .await?
        .json()
        .await?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    println!();

    println!("5. Validation Error:");
    let resp = client
        .post(format!("{SERVER_URL}/embeddings/generate"))
        .json(&json!({}))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);

    Ok(())
}
