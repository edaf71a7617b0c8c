use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use inworld_tts_core::{
    ClientConfig, ConfigEntry, ConfigStore, InMemoryConfigStore, InworldTtsProvider,
    JsonFileStore, RequestOptions, TtsError,
};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn map(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

fn entry(api_url: &str) -> ConfigEntry {
    ConfigEntry::new(
        "Inworld TTS",
        map(json!({
            "api_url": api_url,
            "api_key": "K",
            "language": "en",
            "voice_id": "v1",
            "model_id": "inworld-tts-1",
            "audio_encoding": "MP3",
            "sample_rate_hertz": 48000,
            "temperature": 0.8
        })),
    )
}

fn client_config() -> ClientConfig {
    ClientConfig {
        request_timeout_ms: 5_000,
        stream_timeout_ms: 5_000,
        user_agent: "inworld-tts-tests".to_string(),
    }
}

#[tokio::test]
async fn in_memory_store_round_trip() {
    let store = InMemoryConfigStore::new();
    let e = entry("https://api.inworld.ai/");
    store.save(&e).await.unwrap();

    let loaded = store.load(&e.entry_id).await.unwrap().unwrap();
    assert_eq!(loaded, e);
    assert!(store.load("missing").await.unwrap().is_none());

    let updated = store
        .update_options(&e.entry_id, map(json!({"voice_id": "v3"})))
        .await
        .unwrap();
    assert_eq!(updated.data, e.data);
    assert_eq!(updated.synthesis_config().unwrap().voice_id, "v3");
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_options_on_unknown_entry_fails() {
    let store = InMemoryConfigStore::new();
    let err = store.update_options("nope", Map::new()).await.unwrap_err();
    assert!(matches!(err, TtsError::StorageError(_)));
}

#[tokio::test]
async fn json_file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("entries.json");
    let e = entry("https://api.inworld.ai/");

    {
        let store = JsonFileStore::new(&path);
        assert!(store.list().await.unwrap().is_empty());
        store.save(&e).await.unwrap();
        store
            .update_options(&e.entry_id, map(json!({"temperature": 1.1})))
            .await
            .unwrap();
    }

    let reopened = JsonFileStore::new(&path);
    let loaded = reopened.load(&e.entry_id).await.unwrap().unwrap();
    assert_eq!(loaded.data, e.data);
    assert_eq!(loaded.options["temperature"], 1.1);
    assert_eq!(loaded.synthesis_config().unwrap().temperature, 1.1);
}

#[tokio::test]
async fn corrupt_store_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    tokio::fs::write(&path, b"not json").await.unwrap();

    let err = JsonFileStore::new(&path).list().await.unwrap_err();
    assert!(matches!(err, TtsError::SerializationError(_)));
}

#[test]
fn entry_debug_hides_api_key() {
    let rendered = format!("{:?}", entry("https://api.inworld.ai/"));
    assert!(!rendered.contains("\"K\""));
    assert!(rendered.contains("***"));
}

#[test]
fn entry_without_key_cannot_build_provider() {
    let mut e = entry("https://api.inworld.ai/");
    e.data.remove("api_key");
    let err = InworldTtsProvider::from_entry(&e, &client_config()).err().unwrap();
    assert!(matches!(err, TtsError::ConfigMissing(k) if k == "api_key"));
}

#[tokio::test]
async fn provider_sends_persisted_settings() {
    let line = format!(
        "{{\"result\":{{\"audioContent\":\"{}\"}}}}\n",
        STANDARD.encode(b"audio")
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts/v1/voice:stream"))
        .and(header("authorization", "Basic K"))
        .and(body_json(json!({
            "text": "Hello there",
            "voiceId": "v1",
            "modelId": "inworld-tts-1",
            "temperature": 0.8,
            "audioConfig": {"audioEncoding": "MP3", "sampleRateHertz": 22050}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(line.into_bytes(), "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;
    let e = entry(&server.uri()).with_options(map(json!({"sample_rate_hertz": 22050})));
    let provider = InworldTtsProvider::from_entry(&e, &client_config()).unwrap();

    assert_eq!(provider.name(), "Inworld TTS");
    assert_eq!(provider.unique_id(), format!("inworld_tts_{}", e.entry_id));
    assert_eq!(provider.supported_languages(), vec!["en".to_string()]);
    assert_eq!(provider.default_language(), "en");
    assert_eq!(provider.supported_options(), &["voice"]);

    let audio = provider
        .get_tts_audio("Hello there", "en", &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(audio.bytes, b"audio");
    assert_eq!(audio.content_type, "audio/mpeg");
}

#[tokio::test]
async fn provider_rejects_other_languages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let provider = InworldTtsProvider::from_entry(&entry(&server.uri()), &client_config()).unwrap();

    let err = provider
        .get_tts_audio("Bonjour", "fr", &RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::UnsupportedLanguage(l) if l == "fr"));
}
