mod config;
mod prompt;

use clap::{Parser, Subcommand};
use config::TtsSetupConfig;
use inworld_tts_core::{
    ConfigEntry, ConfigStore, FlowResult, FlowSession, HttpVoiceApi, InworldTtsProvider,
    JsonFileStore, RequestOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tts_setup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Configure Inworld TTS and synthesize speech from the terminal")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the setup flow and save a new entry
    Setup,
    /// Edit the voice and audio options of an existing entry
    Options {
        /// Entry to edit (defaults to the most recent one)
        #[arg(long)]
        entry: Option<String>,
    },
    /// Synthesize text with a saved entry and write the audio to a file
    Speak {
        text: String,
        /// Output file (defaults to tts_output.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        entry: Option<String>,
        /// Must match the entry's language
        #[arg(long)]
        language: Option<String>,
        /// Voice id overriding the configured one for this call
        #[arg(long)]
        voice: Option<String>,
    },
    /// List saved entries
    List,
}

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,inworld_tts_core=info,tts_setup=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();
    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = TtsSetupConfig::load();
    info!(target: "tts_setup", config = ?cfg, "Starting tts_setup");
    let store = JsonFileStore::new(&cfg.store_path);

    match args.command {
        Command::Setup => {
            let api = Arc::new(HttpVoiceApi::new(&cfg.client)?);
            let mut session = FlowSession::setup(api);
            let Some(entry) = drive(&mut session, &cfg).await? else {
                println!("Setup aborted");
                return Ok(());
            };
            store.save(&entry).await?;
            println!("Saved entry {} ({})", entry.entry_id, entry.title);
        }
        Command::Options { entry } => {
            let existing = load_entry(&store, entry.as_deref()).await?;
            let api = Arc::new(HttpVoiceApi::new(&cfg.client)?);
            let mut session = FlowSession::options(api, existing)?;
            let Some(edited) = drive(&mut session, &cfg).await? else {
                println!("Options unchanged");
                return Ok(());
            };
            let saved = store
                .update_options(&edited.entry_id, edited.options.clone())
                .await?;
            println!("Updated options of entry {}", saved.entry_id);
        }
        Command::Speak {
            text,
            output,
            entry,
            language,
            voice,
        } => {
            let entry = load_entry(&store, entry.as_deref()).await?;
            let provider = InworldTtsProvider::from_entry(&entry, &cfg.client)?;
            let language = language.unwrap_or_else(|| provider.default_language().to_string());
            let options = voice.map(RequestOptions::with_voice).unwrap_or_default();

            let audio = provider.get_tts_audio(&text, &language, &options).await?;
            let path =
                output.unwrap_or_else(|| PathBuf::from(format!("tts_output.{}", audio.extension)));
            tokio::fs::write(&path, &audio.bytes).await?;
            info!(
                target: "tts_setup",
                path = %path.display(),
                bytes = audio.bytes.len(),
                content_type = audio.content_type,
                "Audio written"
            );
            println!("Wrote {} bytes of {} to {}", audio.bytes.len(), audio.content_type, path.display());
        }
        Command::List => {
            for e in store.list().await? {
                let summary = e
                    .synthesis_config()
                    .map(|c| format!("{} / {} / {}", c.language, c.voice_id, c.audio_encoding))
                    .unwrap_or_else(|err| format!("incomplete ({err})"));
                println!("{}  {}  {}", e.entry_id, e.title, summary);
            }
        }
    }
    Ok(())
}

/// Entry by id, or the most recently created one
async fn load_entry(store: &JsonFileStore, entry_id: Option<&str>) -> Result<ConfigEntry, BoxError> {
    let found = match entry_id {
        Some(id) => store.load(id).await?,
        None => store.list().await?.pop(),
    };
    found.ok_or_else(|| {
        format!(
            "no saved entry{} in {}; run `tts_setup setup` first",
            entry_id.map(|id| format!(" '{id}'")).unwrap_or_default(),
            store.path().display()
        )
        .into()
    })
}

/// Run a flow session against stdin until it completes. `None` when the user
/// ends input or presses Ctrl-C while a form is shown.
async fn drive(session: &mut FlowSession, cfg: &TtsSetupConfig) -> Result<Option<ConfigEntry>, BoxError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut result = session.start().await;
    if let FlowResult::Form(form) = &mut result {
        // Offer the configured url on the credentials step
        if let (Some(url), Some(field)) = (
            cfg.api_url.as_ref(),
            form.fields.iter_mut().find(|f| f.name == "api_url"),
        ) {
            field.default = Some(serde_json::Value::String(url.clone()));
        }
    }

    loop {
        let form = match result {
            FlowResult::Complete(entry) => return Ok(Some(entry)),
            FlowResult::Form(form) => form,
        };
        let Some(input) = read_form(&form, &mut lines, cfg.api_key.as_deref()).await? else {
            return Ok(None);
        };

        let outcome = tokio::select! {
            r = session.submit(input) => Some(r),
            _ = signal::ctrl_c() => None,
        };
        result = match outcome {
            Some(r) => r,
            None => {
                // The dropped step leaves the session where it was
                warn!(target: "tts_setup", stage = ?session.stage(), "Step cancelled");
                session.render()
            }
        };
    }
}

async fn read_form<R>(
    form: &inworld_tts_core::Form,
    lines: &mut Lines<R>,
    fallback_key: Option<&str>,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, BoxError>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        r = prompt::fill_form(form, lines, fallback_key) => Ok(r?),
        _ = signal::ctrl_c() => Ok(None),
    }
}
