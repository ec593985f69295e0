//! `scribe` CLI: link a blog account, publish a post, or generate promo
//! copy. Each publish run is one isolated browser session; concurrency is
//! achieved by running several invocations, never by sharing a session.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use scribe_common::observability::{init_logging, LogConfig};
use scribe_common::Platform;
use scribe_config::{ScribeConfig, ScribeConfigLoader, WebDriverSection};
use scribe_drivers::blog_browser::driver::SessionOptions;
use scribe_promo::gemini::GeminiClient;
use scribe_promo::prompt::PromoRequest;
use scribe_promo::PromoOutput;
use scribe_publish::{
    AesGcmCipher, Credential, CredentialStore, PublishWorkflow, SecretCipher,
    SqliteCredentialStore, WebDriverProvider,
};

#[derive(Parser)]
#[command(
    name = "scribe",
    version,
    about = "Automated blog publishing for linked store accounts"
)]
struct Cli {
    /// Configuration file (YAML). Missing file falls back to defaults plus
    /// SCRIBE__* environment overrides.
    #[arg(long, default_value = "scribe.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Link a blog account to a store; the password is encrypted at rest.
    Link {
        #[arg(long)]
        store_id: i64,
        #[arg(long)]
        login_id: String,
        #[arg(long)]
        password: String,
    },
    /// Publish a post with the account linked to the store and print the
    /// published URL.
    Publish {
        #[arg(long)]
        store_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        /// Read the body from a file instead of --content.
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Generate promo copy for a store and print it as JSON.
    Promo {
        #[arg(long)]
        store_name: String,
        #[arg(long)]
        mood: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 3)]
        variants: u8,
        #[arg(long, default_value = "ko")]
        language: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ScribeConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let log_path = init_logging(LogConfig {
        emit_stderr: true,
        ..LogConfig::default()
    })?;
    info!(target: "scribe.main", log = %log_path.display(), "scribe starting");

    match cli.command {
        Command::Link {
            store_id,
            login_id,
            password,
        } => link(&config, store_id, login_id, password).await,
        Command::Publish {
            store_id,
            title,
            content,
            content_file,
        } => publish(&config, store_id, title, content, content_file).await,
        Command::Promo {
            store_name,
            mood,
            description,
            location,
            variants,
            language,
        } => {
            promo(
                &config, store_name, mood, description, location, variants, language,
            )
            .await
        }
    }
}

async fn link(
    config: &ScribeConfig,
    store_id: i64,
    login_id: String,
    password: String,
) -> Result<()> {
    let cipher = AesGcmCipher::new(&config.secrets.master_key)?;
    let store = SqliteCredentialStore::connect(&config.storage.database_url).await?;

    let sealed = cipher.encrypt(&password)?;
    store
        .insert(&Credential::new(
            store_id,
            login_id.clone(),
            sealed,
            Platform::NaverBlog,
        ))
        .await?;

    println!("linked {login_id} to store {store_id}");
    Ok(())
}

async fn publish(
    config: &ScribeConfig,
    store_id: i64,
    title: String,
    content: Option<String>,
    content_file: Option<PathBuf>,
) -> Result<()> {
    let content = match (content, content_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => bail!("provide --content or --content-file"),
    };

    let cipher = AesGcmCipher::new(&config.secrets.master_key)?;
    let store = SqliteCredentialStore::connect(&config.storage.database_url).await?;
    let provider = WebDriverProvider::new(session_options(&config.webdriver));

    let workflow = PublishWorkflow::new(
        Arc::new(store),
        Arc::new(cipher),
        Arc::new(provider),
        config.workflow.clone(),
        config.pacing.clone(),
    );

    let url = workflow.publish(store_id, &title, &content).await?;
    println!("{url}");
    Ok(())
}

async fn promo(
    config: &ScribeConfig,
    store_name: String,
    mood: String,
    description: Option<String>,
    location: Option<String>,
    variants: u8,
    language: String,
) -> Result<()> {
    let Some(promo_config) = &config.promo else {
        bail!("no [promo] section in the configuration");
    };

    let client = GeminiClient::new(promo_config.api_key.clone(), promo_config.model.clone())?;
    let request = PromoRequest {
        store_name,
        mood,
        store_description: description,
        location_text: location,
        variants,
        language,
    };

    match client.generate_promo(&request).await? {
        PromoOutput::Variants(variants) => {
            let envelope = serde_json::json!({ "variants": variants });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        PromoOutput::Raw(text) => println!("{text}"),
    }
    Ok(())
}

fn session_options(webdriver: &WebDriverSection) -> SessionOptions {
    SessionOptions {
        endpoint: webdriver.endpoint.clone(),
        headless: webdriver.headless,
        window_size: webdriver.window_size,
        lang: webdriver.lang.clone(),
    }
}
