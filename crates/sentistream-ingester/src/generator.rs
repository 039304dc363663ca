//! Synthetic post generation: a small pool of products and authors, with a
//! fixed 40/30/30 positive/neutral/negative phrasing mix.

use chrono::{SecondsFormat, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

const PRODUCTS: &[&str] = &[
    "iPhone 16",
    "Tesla Model 3",
    "ChatGPT",
    "Netflix",
    "Amazon Prime",
];

const AUTHORS: &[&str] = &[
    "alex_99",
    "tech_guru",
    "user_123",
    "morning_star",
    "pixel_fan",
];

const SOURCES: &[&str] = &["reddit", "twitter"];

/// Phrasing for one post given a uniform roll in `[0, 1)`.
fn content_for(product: &str, roll: f64) -> String {
    if roll < 0.4 {
        format!("I absolutely love the {product}! This is amazing and exceeded my expectations.")
    } else if roll < 0.7 {
        format!("Just tried the {product}. It is what it is. Received it today.")
    } else {
        format!("Very disappointed with the {product}. Terrible experience, would not recommend.")
    }
}

/// Build one randomized stream payload.
pub fn generate_post<R: Rng + ?Sized>(rng: &mut R) -> Value {
    let product = PRODUCTS.choose(rng).copied().unwrap_or(PRODUCTS[0]);
    let author = AUTHORS.choose(rng).copied().unwrap_or(AUTHORS[0]);
    let source = SOURCES.choose(rng).copied().unwrap_or(SOURCES[0]);
    let roll: f64 = rng.random();

    let id = Uuid::new_v4().simple().to_string();
    serde_json::json!({
        "post_id": format!("post_{}", &id[..10]),
        "source": source,
        "content": content_for(product, roll),
        "author": author,
        "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}
