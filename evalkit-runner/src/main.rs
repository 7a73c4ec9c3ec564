//! EvalKit CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use evalkit::Criterion;
use evalkit_runner::{
    config::Config,
    datasets::load_dataset,
    evaluation::{
        run_criteria, run_pairwise, run_precision, CriteriaMode, CriteriaOptions, ExpectedSource,
        JudgeMode, LlmSettings, PairwiseOptions, PairwisePrompts,
    },
    prompts::PromptTemplate,
    providers::create_provider,
    reporting::{
        print_criteria_report, print_pairwise_report, print_precision_report, JsonSummary, RunInfo,
    },
    runner::Executor,
};

#[derive(Parser)]
#[command(name = "evalkit")]
#[command(about = "Evaluate LLM prompts against JSONL datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print a JSON summary to stdout instead of the console report
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExpectedArg {
    /// Compare (type, severity) pairs from `expected_findings`
    Findings,
    /// Compare type labels from `expected_issue_types`
    IssueTypes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum JudgeArg {
    /// JSON verdict with rubric reasoning
    Structured,
    /// Free-text verdict naming A or B
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GradingArg {
    /// Y/N verdict per criterion
    Binary,
    /// [[1-10]] rating against the reference
    Labeled,
}

#[derive(Subcommand)]
enum Commands {
    /// Score extracted findings with precision, recall and F1
    Precision {
        /// JSONL dataset
        #[arg(short, long)]
        dataset: PathBuf,

        /// Analysis prompt template
        #[arg(short, long)]
        prompt: PathBuf,

        /// Ground truth to compare against
        #[arg(long, value_enum, default_value = "findings")]
        expected: ExpectedArg,

        /// Number of parallel requests (overrides config)
        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Compare two prompts with a judge model
    Pairwise {
        #[arg(short, long)]
        dataset: PathBuf,

        /// Template for candidate A
        #[arg(long)]
        prompt_a: PathBuf,

        /// Template for candidate B
        #[arg(long)]
        prompt_b: PathBuf,

        /// Judge template using {answer_a}, {answer_b} and {reference}
        #[arg(long)]
        judge: PathBuf,

        /// How the judge's answer is read
        #[arg(long, value_enum, default_value = "structured")]
        mode: JudgeArg,

        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Grade answers on named criteria
    Criteria {
        #[arg(short, long)]
        dataset: PathBuf,

        /// Candidate prompt template
        #[arg(short, long)]
        prompt: PathBuf,

        /// Comma-separated built-in criteria
        #[arg(long, default_value = "conciseness,helpfulness")]
        criteria: String,

        #[arg(long, value_enum, default_value = "binary")]
        mode: GradingArg,

        /// Show the example's reference to binary graders
        #[arg(long)]
        with_reference: bool,

        /// Divisor for labeled ratings
        #[arg(long, default_value_t = evalkit::DEFAULT_NORMALIZE_BY)]
        normalize_by: f64,

        /// Input field shown to the grader
        #[arg(long, default_value = "code")]
        input_key: String,

        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "evalkit.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("evalkit=debug,evalkit_runner=debug,info")
    } else {
        EnvFilter::new("evalkit=info,evalkit_runner=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let run = RunInfo::now();

    match cli.command {
        Commands::Precision {
            dataset,
            prompt,
            expected,
            parallel,
        } => {
            let config = load_config(cli.config, parallel)?;
            let executor = Executor::new(create_provider(&config)?, config.executor_config());
            let examples = load_dataset(&dataset)?;
            let template = PromptTemplate::from_file(&prompt)?;
            let source = match expected {
                ExpectedArg::Findings => ExpectedSource::Findings,
                ExpectedArg::IssueTypes => ExpectedSource::IssueTypes,
            };

            let report =
                run_precision(&executor, &LlmSettings::from(&config), &template, &examples, source)
                    .await?;

            if cli.json {
                println!("{}", JsonSummary::from_precision(&run, &report).to_json()?);
            } else {
                print_precision_report(&run, &report);
            }
        }

        Commands::Pairwise {
            dataset,
            prompt_a,
            prompt_b,
            judge,
            mode,
            parallel,
        } => {
            let config = load_config(cli.config, parallel)?;
            let executor = Executor::new(create_provider(&config)?, config.executor_config());
            let examples = load_dataset(&dataset)?;
            let prompts = PairwisePrompts {
                prompt_a: PromptTemplate::from_file(&prompt_a)?,
                prompt_b: PromptTemplate::from_file(&prompt_b)?,
                judge: PromptTemplate::from_file(&judge)?,
            };
            let mode = match mode {
                JudgeArg::Structured => JudgeMode::Structured,
                JudgeArg::Keyword => JudgeMode::Keyword,
            };
            let options = PairwiseOptions::new(mode, &run.stamp());

            let report =
                run_pairwise(&executor, &LlmSettings::from(&config), &prompts, &examples, &options)
                    .await?;

            if cli.json {
                println!("{}", JsonSummary::from_pairwise(&run, &report).to_json()?);
            } else {
                print_pairwise_report(&run, &report);
            }
        }

        Commands::Criteria {
            dataset,
            prompt,
            criteria,
            mode,
            with_reference,
            normalize_by,
            input_key,
            parallel,
        } => {
            let criteria = parse_criteria(&criteria)?;
            if normalize_by <= 0.0 {
                return Err("--normalize-by must be positive".into());
            }
            let config = load_config(cli.config, parallel)?;
            let executor = Executor::new(create_provider(&config)?, config.executor_config());
            let examples = load_dataset(&dataset)?;
            let template = PromptTemplate::from_file(&prompt)?;
            let options = CriteriaOptions {
                criteria,
                mode: match mode {
                    GradingArg::Binary => CriteriaMode::Binary { with_reference },
                    GradingArg::Labeled => CriteriaMode::Labeled { normalize_by },
                },
                input_key,
            };

            let report =
                run_criteria(&executor, &LlmSettings::from(&config), &template, &examples, &options)
                    .await?;

            if cli.json {
                println!("{}", JsonSummary::from_criteria(&run, &report).to_json()?);
            } else {
                print_criteria_report(&run, &report);
            }
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

fn load_config(
    path: Option<PathBuf>,
    parallel: Option<usize>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => Config::from_file(&path)?,
        None => Config::load_or_default(),
    };
    config.apply_env_overrides()?;

    if let Some(parallel) = parallel {
        config.runner.parallel_requests = parallel.max(1);
    }

    tracing::info!(
        "Model {} (temperature {}), {} parallel",
        config.model(),
        config.llm.temperature,
        config.runner.parallel_requests
    );
    Ok(config)
}

fn parse_criteria(list: &str) -> Result<Vec<Criterion>, Box<dyn std::error::Error>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Criterion::builtin(name).ok_or_else(|| format!("Unknown criterion: {}", name).into())
        })
        .collect()
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
