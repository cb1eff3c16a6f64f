use sqlx::types::Json;
use sqlx::PgPool;

use shared::constants::WHEEL_CONFIG_ID;
use shared::wheel::{Segment, WheelConfig};

fn default_segments() -> Vec<Segment> {
    [
        ("🍎 Apples", "#FF5A5F"),
        ("🥐 Croissant", "#F7B500"),
        ("🧀 Cheese", "#FFD166"),
        ("🍫 Chocolate", "#8D6E63"),
        ("🥦 Broccoli", "#06D6A0"),
        ("🍣 Sushi", "#118AB2"),
        ("🍇 Grapes", "#9B59B6"),
        ("🎁 Mystery", "#2ECC71"),
    ]
    .into_iter()
    .map(|(label, color)| Segment {
        label: label.to_string(),
        weight: 1,
        color: color.to_string(),
    })
    .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();

    let pool = PgPool::connect(&std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"))
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let cooldown_seconds: i64 = std::env::var("WHEEL_COOLDOWN_SECONDS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(10);

    let config = WheelConfig {
        segments: default_segments(),
        cooldown_seconds,
    };
    if let Err(message) = config.validate() {
        return Err(message.into());
    }

    sqlx::query(
        "INSERT INTO wheel_config (id, segments, cooldown_seconds, updated_at)
         VALUES ($1, $2, $3, now())
         ON CONFLICT (id) DO UPDATE
         SET segments = EXCLUDED.segments,
             cooldown_seconds = EXCLUDED.cooldown_seconds,
             updated_at = now()",
    )
    .bind(WHEEL_CONFIG_ID)
    .bind(Json(&config.segments))
    .bind(config.cooldown_seconds)
    .execute(&pool)
    .await?;

    println!(
        "seeded wheel_config '{}': {} segments, cooldown {}s",
        WHEEL_CONFIG_ID,
        config.segments.len(),
        cooldown_seconds
    );
    Ok(())
}
