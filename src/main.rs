use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deep_thinking::{
    config::{Config, LogFormat, LoggingConfig, ReasoningConfig},
    langbase::{LangbaseClient, LangbaseGenerator},
    reasoning::{
        CancellationFlag, CognitiveState, Emotion, EmotionState, LearningReadiness,
        MetacognitiveController, ReasoningPlanner, ReasoningRequest, ThinkingMode,
    },
};

/// Metacognitive reasoning for tutoring queries
#[derive(Parser)]
#[command(name = "deep-thinking", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score complexity, pick a thinking mode and size the budget (no network)
    Analyze(QueryArgs),
    /// Run the full pipeline against the Langbase step pipe
    Run(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// The learner's query
    query: String,

    /// Emotion factor in [0, 1] (0 = struggling, 1 = confident)
    #[arg(long)]
    emotion_factor: Option<f64>,

    /// Primary emotion label, e.g. confused or confident
    #[arg(long)]
    emotion: Option<Emotion>,

    /// Valence in [-1, 1], combined with --emotion
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    valence: f64,

    /// Cognitive load in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    cognitive_load: f64,

    /// Readiness in [0, 1]
    #[arg(long, conflicts_with = "readiness_level")]
    readiness: Option<f64>,

    /// Readiness level: optimal, high, moderate, low, not_ready
    #[arg(long)]
    readiness_level: Option<LearningReadiness>,

    /// Preferred thinking mode (advisory only)
    #[arg(long)]
    mode: Option<ThinkingMode>,

    /// Provider token ceiling for this call
    #[arg(long)]
    max_tokens: Option<u32>,
}

impl QueryArgs {
    fn into_request(self) -> ReasoningRequest {
        let emotion = match (self.emotion, self.emotion_factor) {
            (Some(label), Some(factor)) => EmotionState::new(factor).with_emotion(label),
            (Some(label), None) => EmotionState::from_emotion(label, self.valence),
            (None, Some(factor)) => EmotionState::new(factor),
            (None, None) => EmotionState::default(),
        };
        let cognitive = match (self.readiness_level, self.readiness) {
            (Some(level), _) => CognitiveState::with_readiness_level(self.cognitive_load, level),
            (None, Some(readiness)) => CognitiveState::new(self.cognitive_load, readiness),
            (None, None) => CognitiveState::new(self.cognitive_load, 0.5),
        };

        let mut request = ReasoningRequest::new(self.query)
            .with_emotion(emotion)
            .with_cognitive(cognitive);
        if let Some(mode) = self.mode {
            request = request.with_requested_mode(mode);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_provider_max_tokens(max_tokens);
        }
        request
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => analyze(args),
        Command::Run(args) => run(args).await,
    }
}

fn analyze(args: QueryArgs) -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging(&LoggingConfig::from_env());

    let planner = ReasoningPlanner::new(&ReasoningConfig::from_env());
    let plan = planner.plan(&args.into_request());
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn run(args: QueryArgs) -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Deep thinking starting..."
    );

    let client = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    if let Err(e) = client.ensure_reasoning_pipe(&config.pipes.reasoning).await {
        error!(error = %e, "Failed to ensure reasoning pipe exists");
        return Err(e.into());
    }

    let generator = Arc::new(LangbaseGenerator::new(client, &config.pipes.reasoning));
    let controller = MetacognitiveController::new(generator, config.reasoning);

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing with the best chain so far");
            on_interrupt.cancel();
        }
    });

    let outcome = controller
        .run_with_cancel(args.into_request(), &cancel)
        .await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    info!(
        mode = %outcome.decision.mode,
        steps = outcome.chain.len(),
        "Done"
    );
    Ok(())
}

/// Initialize tracing/logging on stderr so stdout stays machine-readable
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
