// src/main.rs

use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct FunctionPrediction {
    function: String,
    labor_hours: String,
    fte: String,
}

#[derive(Debug, Deserialize)]
struct PredictionResult {
    functions: Vec<FunctionPrediction>,
    total_hours: String,
    total_fte: String,
}

#[derive(Debug, Deserialize)]
struct OvertimeAllocation {
    function: String,
    overtime_hours: String,
}

#[derive(Debug, Deserialize)]
struct OvertimeBreakdown {
    policy: String,
    expected_overtime_fte: String,
    allocations: Vec<OvertimeAllocation>,
}

#[derive(Debug, Deserialize)]
struct VtoBreakdown {
    extra_fte: String,
    total_vto_hours: String,
    vto_hours_per_person: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url = env::var("LABOR_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let token = match env::var("LABOR_API_TOKEN") {
        Ok(token) => token,
        Err(_) => prompt_for_token()?,
    };
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health_response);

    // Test 2: Unauthenticated API call must be rejected
    println!("\n🔍 Testing that /api requires a token...");
    let rejected = client
        .post(format!("{}/api/predict", base_url))
        .json(&json!({ "volumes": {} }))
        .send()
        .await?;
    println!("Unauthenticated status: {} (expected 401)", rejected.status());

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token))?,
    );
    let volumes = json!({
        "Receiving": 250,
        "Case Picking": 9900,
        "Putaway": 220,
        "Loading": 480
    });

    // Test 3: Prediction
    println!("\n🔍 Testing prediction endpoint...");
    let response = client
        .post(format!("{}/api/predict", base_url))
        .headers(headers.clone())
        .json(&json!({ "volumes": volumes }))
        .send()
        .await?;
    println!("Prediction status: {}", response.status());
    if response.status().is_success() {
        let prediction = response.json::<PredictionResult>().await?;
        for p in &prediction.functions {
            println!("  {:<16} {:>12} h {:>12} FTE", p.function, p.labor_hours, p.fte);
        }
        println!("  Total: {} h, {} FTE", prediction.total_hours, prediction.total_fte);
    } else {
        println!("Prediction failed: {}", response.text().await?);
    }

    // Test 4: Overtime under both policies
    for policy in ["proportional", "sequential"] {
        println!("\n🔍 Testing overtime endpoint ({})...", policy);
        let response = client
            .post(format!("{}/api/overtime", base_url))
            .headers(headers.clone())
            .json(&json!({ "volumes": volumes, "threshold": 8, "policy": policy }))
            .send()
            .await?;
        if response.status().is_success() {
            let breakdown = response.json::<OvertimeBreakdown>().await?;
            println!(
                "  {} policy, {} overtime FTE",
                breakdown.policy, breakdown.expected_overtime_fte
            );
            for a in &breakdown.allocations {
                println!("  {:<16} {:>12} h", a.function, a.overtime_hours);
            }
        } else {
            println!("Overtime failed: {}", response.text().await?);
        }
    }

    // Test 5: VTO
    println!("\n🔍 Testing VTO endpoint...");
    let response = client
        .post(format!("{}/api/vto", base_url))
        .headers(headers.clone())
        .json(&json!({ "volumes": volumes, "headcount": 20 }))
        .send()
        .await?;
    if response.status().is_success() {
        let vto = response.json::<VtoBreakdown>().await?;
        println!(
            "  extra FTE {}, {} VTO hours, {} per person",
            vto.extra_fte, vto.total_vto_hours, vto.vto_hours_per_person
        );
    } else {
        println!("VTO failed: {}", response.text().await?);
    }

    // Test 6: Validation error surfaces as 422
    println!("\n🔍 Testing validation error...");
    let response = client
        .post(format!("{}/api/predict", base_url))
        .headers(headers)
        .json(&json!({ "volumes": { "Receiving": -1 } }))
        .send()
        .await?;
    println!("Negative volume status: {} (expected 422)", response.status());
    println!("Body: {}", response.text().await?);

    println!("\n✅ All tests completed!");
    Ok(())
}

fn prompt_for_token() -> Result<String, Box<dyn Error>> {
    use std::io::{self, Write};

    print!("Enter the API bearer token: ");
    io::stdout().flush()?;

    let mut token = String::new();
    io::stdin().read_line(&mut token)?;

    Ok(token.trim().to_string())
}
