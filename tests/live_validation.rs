use std::{env, sync::Once};

use rustydigest::{
    config,
    processing::{DocumentMetadata, SourceDocument, SummaryService, SummaryTier},
    summarization::{self, GenerationRequest},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() -> &'static config::Config {
    INIT.call_once(|| {
        set_default_env("LLM_PROVIDER", "ollama");
        set_default_env("LLM_MODEL", "llama3.1");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        config::init_config().expect("live configuration");
    });
    config::get_config()
}

#[tokio::test]
#[ignore = "Requires live LLM provider"]
async fn live_provider_generates_text() {
    let config = init_config_once();
    let client = summarization::build_generation_client(config).expect("client");
    let text = client
        .generate(GenerationRequest::new("Reply with the single word: ready", 16))
        .await
        .expect("failed to request a completion from provider");
    assert!(!text.trim().is_empty(), "provider returned empty text");
}

#[tokio::test]
#[ignore = "Requires live LLM provider"]
async fn live_flash_summary_of_short_text() {
    let config = init_config_once();
    let service = SummaryService::from_config(config).expect("service");
    let text = "The lighthouse keeper logged every ship that passed the headland. \
        Storms in the autumn of that year wrecked two schooners on the reef. \
        A new beacon was installed the following spring and no ships were lost again.";
    let outcome = service
        .summarize_text(
            SourceDocument::new(text, DocumentMetadata::default()),
            "flash",
        )
        .await
        .expect("live summary");
    assert_eq!(outcome.tier, SummaryTier::Flash);
    assert_eq!(outcome.chunk_count, 1);
    assert!(outcome.word_count > 0);
}
