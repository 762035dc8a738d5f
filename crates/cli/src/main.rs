#![deny(warnings)]

mod serve;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use translator_core::anki::{build_deck, BackTranslation, DeckOptions, DEFAULT_DECK_TAG};
use translator_core::config::{
    resolve_api_key, resolve_listen_addr, resolve_max_concurrency, resolve_string_with_default,
    ApiKeys, DispatchPolicy, Env, FailurePolicy, ProviderKind, RequestTimeout, ServiceConfig,
    StdEnv, DEFAULT_PROVIDER, DEFAULT_REQUEST_TIMEOUT_MS, ENV_DEEPL_API_KEY,
    ENV_TRANSLATOR_LISTEN_ADDR, ENV_TRANSLATOR_MAX_CONCURRENCY, ENV_TRANSLATOR_PROVIDER,
};
use translator_core::service::{BatchTranslationRequest, TranslationRequest, TranslationService};
use translator_core::translate::build_translator;

#[derive(Parser, Debug)]
#[command(name = "translator")]
#[command(about = "Single and batch text translation over a pluggable provider")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// google, deepl or echo
    #[arg(long, global = true)]
    provider: Option<String>,

    #[arg(long, global = true)]
    deepl_api_key: Option<String>,

    /// Cap on provider calls in flight per batch (unbounded when unset)
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,

    /// Cancel the rest of a batch as soon as one item fails
    #[arg(long, global = true, default_value_t = false)]
    fail_fast: bool,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the Translate and BatchTranslate operations over HTTP
    Serve {
        #[arg(long)]
        listen: Option<String>,

        #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
        request_timeout_ms: u64,
    },
    /// Translate one text
    Translate {
        #[arg(long, short = 's', default_value = "en")]
        source: String,

        #[arg(long, short = 't', default_value = "ja")]
        target: String,

        text: String,
    },
    /// Translate several texts concurrently, printing one result per line
    Batch {
        #[arg(long, short = 's', default_value = "en")]
        source: String,

        #[arg(long, short = 't', default_value = "ja")]
        target: String,

        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Build an Anki deck CSV (Front,Back,POS,Tags) from `front,back` word pairs
    Anki {
        input: PathBuf,

        #[arg(long, short = 'o', default_value = "vocab.csv")]
        output: PathBuf,

        #[arg(long, default_value = DEFAULT_DECK_TAG)]
        tag: String,

        /// Translate every back into this language before writing
        #[arg(long)]
        translate_to: Option<String>,

        /// Language the backs are written in
        #[arg(long, default_value = "en")]
        back_lang: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.common.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        provider = %cfg.provider,
        max_concurrency = ?cfg.dispatch.max_concurrency,
        on_failure = ?cfg.dispatch.on_failure,
        "config loaded"
    );

    let translator = build_translator(&cfg)?;
    let service = TranslationService::new(translator, cfg.dispatch);

    match args.command {
        Command::Serve { .. } => serve::run(service, &cfg).await?,
        Command::Translate {
            source,
            target,
            text,
        } => {
            let out = service
                .translate(TranslationRequest {
                    text,
                    source_lang: source,
                    target_lang: target,
                })
                .await?;
            println!("{out}");
        }
        Command::Batch {
            source,
            target,
            texts,
        } => {
            let out = service
                .batch_translate(BatchTranslationRequest {
                    texts,
                    source_lang: source,
                    target_lang: target,
                })
                .await?;
            for line in out {
                println!("{line}");
            }
        }
        Command::Anki {
            input,
            output,
            tag,
            translate_to,
            back_lang,
        } => {
            let options = DeckOptions {
                tag,
                translate_back: translate_to.map(|target_lang| BackTranslation {
                    source_lang: back_lang,
                    target_lang,
                }),
            };
            let words = File::open(&input)
                .with_context(|| format!("failed to open {}", input.display()))?;
            let deck = build_deck(&service, BufReader::new(words), &options).await?;

            // Created only once the deck is complete, so a failed
            // translation leaves no partial file behind.
            let file = File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            deck.write_csv(BufWriter::new(file))?;
            tracing::info!(cards = deck.len(), path = %output.display(), "deck written");
        }
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<ServiceConfig> {
    let common = &args.common;

    let provider = resolve_string_with_default(
        common.provider.clone(),
        ENV_TRANSLATOR_PROVIDER,
        env,
        DEFAULT_PROVIDER,
    )
    .parse::<ProviderKind>()?;

    let deepl = resolve_api_key(common.deepl_api_key.clone(), ENV_DEEPL_API_KEY, env)?;

    let dispatch = DispatchPolicy {
        max_concurrency: resolve_max_concurrency(
            common.max_concurrency,
            ENV_TRANSLATOR_MAX_CONCURRENCY,
            env,
        )?,
        on_failure: if common.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::WaitAll
        },
    };

    let (listen, timeout_ms) = match &args.command {
        Command::Serve {
            listen,
            request_timeout_ms,
        } => (listen.clone(), *request_timeout_ms),
        _ => (None, DEFAULT_REQUEST_TIMEOUT_MS),
    };
    let listen_addr = resolve_listen_addr(listen, ENV_TRANSLATOR_LISTEN_ADDR, env)?;

    Ok(ServiceConfig {
        listen_addr,
        provider,
        api_keys: ApiKeys { deepl },
        dispatch,
        request_timeout: RequestTimeout::new(timeout_ms)?,
    })
}
