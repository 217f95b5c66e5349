use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use speech_drill::db::{self, PhraseRepo, ScenarioRepo, StreamRepo, UserRepo};
use speech_drill::{
    AnswerRequest, CloudStt, CloudTts, Config, Error, NoiseInjector, PracticePipeline,
    PracticeRequest, SimilarityScorer,
};

/// Drill - synthesized listening practice with scored spoken answers
#[derive(Parser)]
#[command(name = "drill", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Time budget for a practice or answer request, in seconds
    #[arg(long, env = "DRILL_REQUEST_TIMEOUT", default_value = "60")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a user
    AddUser {
        name: String,
        login: String,
    },
    /// Add a reference phrase
    AddPhrase {
        text: String,
        /// Phrase type title; created on the fly
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Start a scenario for a user
    AddScenario {
        #[arg(short, long)]
        user: Uuid,
        title: String,
        #[arg(long, default_value = "active")]
        status: String,
    },
    /// Synthesize a phrase with noise and open a phrase-stream
    Practice {
        #[arg(long)]
        phrase: Uuid,
        #[arg(long)]
        scenario: Uuid,
        /// Voice/accent selector for the TTS service
        #[arg(long, default_value = "")]
        accent: String,
        /// Noise intensity (standard deviation relative to full scale)
        #[arg(long, default_value = "0")]
        noise: f64,
        /// Seed for reproducible noise
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Transcribe and score a recorded answer
    Answer {
        #[arg(long)]
        stream: Uuid,
        #[arg(short, long)]
        user: Uuid,
        /// Recorded answer audio
        audio: PathBuf,
    },
    /// Show a user's practice progress
    Progress {
        #[arg(short, long)]
        user: Uuid,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Inject noise into a local audio file
    Noise {
        input: PathBuf,
        #[arg(long)]
        intensity: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score a transcript against a phrase offline
    Score {
        expected: String,
        transcript: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,speech_drill=info",
        1 => "info,speech_drill=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let budget = Duration::from_secs(cli.timeout);

    // Offline commands need neither config nor database
    match cli.command {
        Command::Noise {
            input,
            intensity,
            seed,
        } => {
            let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let output = NoiseInjector::new().process(&input, intensity, &mut rng)?;
            println!("{}", output.display());
            return Ok(());
        }
        Command::Score {
            expected,
            transcript,
        } => {
            let verdict = SimilarityScorer::default().score(&expected, &transcript);
            println!(
                "similarity {:.4} -> {}",
                verdict.similarity,
                if verdict.is_correct { "correct" } else { "incorrect" }
            );
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load()?;
    let pool = db::init(config.db_path())?;

    match cli.command {
        Command::AddUser { name, login } => {
            let user = UserRepo::new(pool).create(&name, &login)?;
            println!("{}", user.id);
        }
        Command::AddPhrase { text, kind } => {
            let repo = PhraseRepo::new(pool);
            let type_id = kind.map(|title| repo.create_type(&title)).transpose()?;
            let phrase = repo.create(&text, type_id.map(|t| t.id))?;
            println!("{}", phrase.id);
        }
        Command::AddScenario {
            user,
            title,
            status,
        } => {
            let scenario = ScenarioRepo::new(pool).create(user, &title, &status)?;
            println!("{}", scenario.id);
        }
        Command::Practice {
            phrase,
            scenario,
            accent,
            noise,
            seed,
        } => {
            let pipeline = build_pipeline(&config, pool)?;
            let request = PracticeRequest {
                phrase_id: phrase,
                scenario_id: scenario,
                accent,
                noise,
                seed,
            };
            let practice = with_budget(budget, pipeline.create_phrase_stream(&request))
                .await
                .map_err(Error::practice)?;
            println!("{}", practice.stream.id);
            println!("{}", practice.audio.path_to_audio.display());
        }
        Command::Answer { stream, user, audio } => {
            let pipeline = build_pipeline(&config, pool)?;
            let request = AnswerRequest {
                stream_id: stream,
                user_id: user,
                audio_path: audio,
                record_time: chrono::Utc::now(),
            };
            let evaluation = match with_budget(budget, pipeline.evaluate_answer(&request)).await {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    let e = e.evaluation();
                    if e.is_retryable() {
                        tracing::warn!("answer can be resubmitted");
                    }
                    return Err(e.into());
                }
            };
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        Command::Progress { user, json } => {
            let progress = StreamRepo::new(pool).student_progress(user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                for row in progress {
                    println!(
                        "{:<12} {:<10} {}",
                        row.phrase_stream_status, row.scenario_status, row.phrase
                    );
                }
            }
        }
        Command::Noise { .. } | Command::Score { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn build_pipeline(config: &Config, pool: db::DbPool) -> anyhow::Result<PracticePipeline> {
    let tts = Arc::new(CloudTts::new(&config.speech)?);
    let stt = Arc::new(CloudStt::new(&config.speech)?);
    Ok(
        PracticePipeline::new(pool, tts, stt, config.audio_dir())
            .with_scorer(SimilarityScorer::new(config.threshold)),
    )
}

/// Bound a request by the caller's time budget
async fn with_budget<T>(
    budget: Duration,
    fut: impl Future<Output = speech_drill::Result<T>>,
) -> speech_drill::Result<T> {
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| Error::Timeout(budget))?
}
