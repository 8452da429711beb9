use beluga::{GraphDocument, OverlapPreventionParameters, SetupKind};
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Layout(beluga::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Layout(err) => write!(f, "layout error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<beluga::Error> for CliError {
    fn from(value: beluga::Error) -> Self {
        Self::Layout(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SetupArg {
    SquareRandom,
    SquareRandomBarycenter,
    CircleAnnealing,
}

impl SetupArg {
    fn kind(self) -> SetupKind {
        match self {
            SetupArg::SquareRandom => SetupKind::SquareRandom(Default::default()),
            SetupArg::SquareRandomBarycenter => {
                SetupKind::SquareRandomBarycenter(Default::default())
            }
            SetupArg::CircleAnnealing => SetupKind::CircleAnnealing(Default::default()),
        }
    }
}

/// Lay out a JSON graph document and print the final positions as JSON.
#[derive(Parser, Debug)]
#[command(name = "beluga", version, about, long_about = None)]
struct Args {
    /// Graph document to lay out; `-` or nothing reads stdin
    input: Option<PathBuf>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Overrides the document seed
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides `parameters.maxSteps`
    #[arg(long)]
    max_steps: Option<usize>,

    /// Overrides the document setup strategy (with its default settings)
    #[arg(long, value_enum)]
    setup: Option<SetupArg>,

    /// Run overlap prevention with default settings unless the document configures it
    #[arg(long)]
    overlap_prevention: bool,

    /// Emit only the position map, without the run report
    #[arg(long)]
    positions_only: bool,

    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace); RUST_LOG wins if set
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, doc: &mut GraphDocument) {
        if let Some(seed) = self.seed {
            doc.seed = Some(seed);
        }
        if let Some(max_steps) = self.max_steps {
            doc.parameters.max_steps = max_steps;
        }
        if let Some(setup) = self.setup {
            doc.setup = setup.kind();
        }
        if self.overlap_prevention && doc.overlap_prevention.is_none() {
            doc.overlap_prevention = Some(OverlapPreventionParameters::default());
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(input: Option<&PathBuf>) -> Result<String, CliError> {
    match input {
        Some(path) if path.as_os_str() != "-" => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn to_json(value: &impl Serialize, pretty: bool) -> Result<String, CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    Ok(text)
}

fn run(args: &Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_ref())?;
    let mut doc: GraphDocument = serde_json::from_str(&text)?;
    args.apply(&mut doc);

    let output = doc.run()?;
    tracing::info!(
        state = ?output.report.state,
        steps = output.report.steps,
        vertices = output.positions.len(),
        "layout finished"
    );

    let json = if args.positions_only {
        to_json(&output.positions, args.pretty)?
    } else {
        to_json(&output, args.pretty)?
    };
    match &args.out {
        Some(path) => std::fs::write(path, json)?,
        None => std::io::stdout().lock().write_all(json.as_bytes())?,
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        let code = match err {
            CliError::Layout(_) => 3,
            CliError::Io(_) | CliError::Json(_) => 1,
        };
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::{Args, SetupArg};
    use beluga::{GraphDocument, SetupKind};
    use clap::Parser;

    #[test]
    fn overrides_apply_to_the_document() {
        let args = Args::parse_from([
            "beluga",
            "--seed",
            "11",
            "--max-steps",
            "5",
            "--setup",
            "circle-annealing",
            "--overlap-prevention",
        ]);
        let mut doc = GraphDocument::default();
        args.apply(&mut doc);
        assert_eq!(doc.seed, Some(11));
        assert_eq!(doc.parameters.max_steps, 5);
        assert!(matches!(doc.setup, SetupKind::CircleAnnealing(_)));
        assert!(doc.overlap_prevention.is_some());
        assert_eq!(args.setup, Some(SetupArg::CircleAnnealing));
    }

    #[test]
    fn document_overlap_settings_are_kept() {
        let args = Args::parse_from(["beluga", "--overlap-prevention", "doc.json"]);
        let mut doc: GraphDocument =
            serde_json::from_str(r#"{ "overlapPrevention": { "iterations": 4 } }"#).unwrap();
        args.apply(&mut doc);
        assert_eq!(doc.overlap_prevention.map(|p| p.iterations), Some(4));
    }
}
