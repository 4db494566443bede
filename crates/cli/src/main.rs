use anyhow::{bail, Context, Result};
use klondike_core::{deal, verify_moves, GameSnapshot, GameState};
use klondike_solver::{load_config, write_json, write_text, SolveReport, Solver, SolverConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_DEAL_SEED: u32 = 42;
const USAGE: &str = "usage: klondike-cli [--seed N] [--snapshot FILE] [--config FILE] \
[--n0 N] [--n1 N] [--max-time SECS] [--tie-seed N] [--json FILE] [--text FILE] [--quiet]";

#[derive(Debug, Default)]
struct CliOptions {
    seed: Option<u32>,
    snapshot: Option<PathBuf>,
    config: Option<PathBuf>,
    n0: Option<i32>,
    n1: Option<i32>,
    max_time_secs: Option<f64>,
    tie_seed: Option<u64>,
    json: Option<PathBuf>,
    text: Option<PathBuf>,
    quiet: bool,
    help: bool,
}

fn flag_value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str> {
    args.get(idx + 1)
        .map(String::as_str)
        .with_context(|| format!("{flag} needs a value"))
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T> {
    value
        .parse::<T>()
        .ok()
        .with_context(|| format!("invalid value for {flag}: {value}"))
}

fn parse_cli_options(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions {
        config: std::env::var_os("KLONDIKE_CONFIG").map(PathBuf::from),
        ..CliOptions::default()
    };
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "--quiet" | "-q" => options.quiet = true,
            "--help" | "-h" => options.help = true,
            "--seed" => options.seed = Some(parse_number(flag_value(args, idx, flag)?, flag)?),
            "--n0" => options.n0 = Some(parse_number(flag_value(args, idx, flag)?, flag)?),
            "--n1" => options.n1 = Some(parse_number(flag_value(args, idx, flag)?, flag)?),
            "--max-time" => {
                options.max_time_secs = Some(parse_number(flag_value(args, idx, flag)?, flag)?)
            }
            "--tie-seed" => {
                options.tie_seed = Some(parse_number(flag_value(args, idx, flag)?, flag)?)
            }
            "--snapshot" => options.snapshot = Some(PathBuf::from(flag_value(args, idx, flag)?)),
            "--config" => options.config = Some(PathBuf::from(flag_value(args, idx, flag)?)),
            "--json" => options.json = Some(PathBuf::from(flag_value(args, idx, flag)?)),
            "--text" => options.text = Some(PathBuf::from(flag_value(args, idx, flag)?)),
            other => bail!("unknown argument: {other}\n{USAGE}"),
        }
        if !matches!(flag, "--quiet" | "-q" | "--help" | "-h") {
            idx += 1;
        }
        idx += 1;
    }
    if options.seed.is_some() && options.snapshot.is_some() {
        bail!("--seed and --snapshot are mutually exclusive");
    }
    Ok(options)
}

fn build_config(options: &CliOptions) -> Result<SolverConfig> {
    let mut config = match options.config.as_deref() {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading solver config");
            load_config(path).with_context(|| format!("load config {}", path.display()))?
        }
        None => SolverConfig::default(),
    };
    if let Some(n0) = options.n0 {
        config.n0 = n0;
    }
    if let Some(n1) = options.n1 {
        config.n1 = n1;
    }
    if let Some(secs) = options.max_time_secs {
        if !secs.is_finite() || secs <= 0.0 {
            bail!("--max-time must be a positive number of seconds");
        }
        config = config.with_time_limit(Duration::from_secs_f64(secs));
    }
    if options.tie_seed.is_some() {
        config.tie_break_seed = options.tie_seed;
    }
    config.validate()?;
    Ok(config)
}

fn load_snapshot(path: &Path) -> Result<GameState> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read snapshot {}", path.display()))?;
    let snapshot: GameSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("parse snapshot {}", path.display()))?;
    GameState::from_snapshot(&snapshot)
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("klondike_solver=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &[String]) -> Result<()> {
    let options = parse_cli_options(args)?;
    if options.help {
        println!("{USAGE}");
        return Ok(());
    }
    if !options.quiet {
        init_tracing();
    }
    let config = build_config(&options)?;

    let (root, seed) = match options.snapshot.as_deref() {
        Some(path) => (load_snapshot(path)?, None),
        None => {
            let seed = options.seed.unwrap_or(DEFAULT_DEAL_SEED);
            (deal(seed), Some(seed))
        }
    };
    if !options.quiet {
        println!("{root}");
        println!();
    }

    let mut solver = Solver::new(config)?;
    let search_root = root.clone();
    let worker = std::thread::spawn(move || solver.solve(&search_root));
    let outcome = worker
        .join()
        .map_err(|_| anyhow::anyhow!("solver thread panicked"))?;

    let report = SolveReport::from_outcome(&outcome, seed);
    verify_moves(&root, &report.moves).context("solver returned an illegal line")?;

    if let Some(path) = options.json.as_deref() {
        write_json(path, &report).with_context(|| format!("write {}", path.display()))?;
    }
    if let Some(path) = options.text.as_deref() {
        write_text(path, &report).with_context(|| format!("write {}", path.display()))?;
    }
    if options.quiet {
        println!(
            "{} moves={} foundation={}",
            if report.win { "win" } else { "no-win" },
            report.moves.len(),
            report.foundation_cards
        );
    } else {
        println!("{}", report.to_text_report());
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_overrides() {
        let options = parse_cli_options(&args(&[
            "--seed", "7", "--n0", "2", "--max-time", "1.5", "--tie-seed", "9", "--quiet",
        ]))
        .expect("parse");
        assert_eq!(options.seed, Some(7));
        assert!(options.quiet);

        let config = build_config(&CliOptions {
            config: None,
            ..options
        })
        .expect("config");
        assert_eq!(config.n0, 2);
        assert_eq!(config.n1, 1);
        assert_eq!(config.max_time_ms, 1500);
        assert_eq!(config.tie_break_seed, Some(9));
    }

    #[test]
    fn rejects_unknown_and_missing_values() {
        assert!(parse_cli_options(&args(&["--bogus"])).is_err());
        assert!(parse_cli_options(&args(&["--seed"])).is_err());
        assert!(parse_cli_options(&args(&["--seed", "x"])).is_err());
        assert!(parse_cli_options(&args(&["--seed", "1", "--snapshot", "a.json"])).is_err());
    }

    #[test]
    fn rejects_nonpositive_time() {
        let options = CliOptions {
            max_time_secs: Some(0.0),
            ..CliOptions::default()
        };
        assert!(build_config(&options).is_err());
    }
}
