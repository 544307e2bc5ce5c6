//! Scripted Run - wiring a pipeline end to end
//!
//! Runs the discovery pipeline against a scripted session and classifier,
//! printing progress events as they arrive and the final result as JSON.
//! A real site adapter replaces `ScriptedSession` with its browser-backed
//! `PageSession`, and `MockClassifier` with `OpenAIClassifier`.
//!
//! Configuration comes from `DISCOVERY_*` environment variables (or `.env`).
//! The settle delay defaults to two seconds per page; set
//! `DISCOVERY_SETTLE_DELAY_MS=0` for an instant run.
//!
//! ```bash
//! RUST_LOG=info,job_discovery=debug cargo run --example scripted_run
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_discovery::testing::{batch_question_names, MockClassifier, ScriptedSession};
use job_discovery::{
    ItemStub, Language, Pipeline, PipelineConfig, PipelineInput, ProgressFeed, StrategyId,
    TargetProfile,
};

fn listing() -> Vec<Vec<ItemStub>> {
    let titles = [
        "Juriste droit de la famille",
        "Stage juriste",
        "Comptable",
        "Juriste contentieux",
        "Assistant juridique",
        "Chef de cuisine",
        "Juriste protection de l'enfance",
        "Développeur Rust",
    ];

    let stubs: Vec<ItemStub> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| ItemStub::new(format!("{}", 4000 + i), *title))
        .collect();

    stubs.chunks(3).map(|chunk| chunk.to_vec()).collect()
}

fn classifier() -> MockClassifier {
    MockClassifier::new()
        .with_responder(|question| {
            batch_question_names(question).map(|names| {
                names
                    .iter()
                    .map(|name| {
                        let lower = name.to_lowercase();
                        if lower.contains("juri") {
                            "1"
                        } else if lower.contains("assistant") {
                            "0"
                        } else {
                            "-1"
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
        })
        .with_answer("contentieux", "-1")
        .with_default_answer("1")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_discovery=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Configuration loaded");

    let session = ScriptedSession::new()
        .with_link_base("https://jobs.example.test/view")
        .with_pages(listing())
        .with_broken_strategy(StrategyId::new(1))
        .fail_detail("4006");

    let feed = ProgressFeed::new();
    let mut events = feed.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("progress: {}", event.to_json());
        }
    });

    let pipeline = Pipeline::new(session, config)
        .with_classifier(classifier())
        .with_progress(feed);

    let input = PipelineInput::new()
        .with_skip_ids(["4000"])
        .with_banned_words(["stage"])
        .with_target_profile(
            TargetProfile::new("Juriste en droit de la famille, Paris", Language::Fr)
                .context("Invalid target profile")?,
        );

    let result = pipeline
        .try_run(&input)
        .await
        .context("Discovery run aborted")?;

    drop(pipeline);
    printer.await.context("Progress printer panicked")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
