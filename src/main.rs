//! The `graphfuzz` command-line driver.
//!
//! ```sh
//! graphfuzz shortest_path --feedback hop_count --iterations 100
//! graphfuzz scc --test-method metamorphic --algorithm tarjan --timeout 5
//! graphfuzz mst --campaign regular,coverage,max_degree --time-limit 600
//! ```
//!
//! The first Ctrl-C stops the fuzz loop after its current test and prints the
//! summary. A second one exits immediately.

use anyhow::{bail, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use graphfuzz::config::{FuzzConfig, OutputSink, TestMethod, DEFAULT_ITERATIONS};
use graphfuzz::feedback::FeedbackKind;
use graphfuzz::fuzzer::Campaign;
use graphfuzz::scheduler::SchedulerKind;
use graphfuzz::{seeds, targets, Fuzzer, Rng, StopToken};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LOG_DIR: &str = "Log";

fn command() -> Command {
    Command::new("graphfuzz")
        .about("feedback-guided differential and metamorphic fuzzing of graph algorithms")
        .arg(
            Arg::new("target")
                .help("the algorithm family to fuzz")
                .required(true)
                .value_parser(targets::NAMES),
        )
        .arg(
            Arg::new("test-method")
                .long("test-method")
                .help("how mutated graphs are checked")
                .value_parser(["differential", "metamorphic"])
                .default_value("differential"),
        )
        .arg(
            Arg::new("algorithm")
                .long("algorithm")
                .help("the implementation checked by metamorphic testing"),
        )
        .arg(
            Arg::new("iterations")
                .long("iterations")
                .help("mutations per seed selection")
                .value_parser(value_parser!(usize))
                .default_value("60"),
        )
        .arg(
            Arg::new("use-multiple-graphs")
                .long("use-multiple-graphs")
                .help("start from several random graphs instead of a single node")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("feedback")
                .long("feedback")
                .help("which feedback decides what enters the corpus")
                .default_value("regular"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .help("where log output goes")
                .value_parser(["console", "file"])
                .default_value("console"),
        )
        .arg(
            Arg::new("scheduler")
                .long("scheduler")
                .help("corpus storage backend")
                .value_parser(["mem", "disk"])
                .default_value("mem"),
        )
        .arg(
            Arg::new("folder")
                .long("folder")
                .help("corpus folder of the disk scheduler")
                .value_parser(value_parser!(PathBuf))
                .default_value("graphs_folder"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("per-test time budget in seconds")
                .value_parser(value_parser!(f64))
                .default_value("20"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("random seed, for reproducible runs")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("corpus")
                .long("corpus")
                .help("a corpus snapshot from an earlier run to seed from")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("where to save the corpus, exceptions and discrepancy log")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("campaign")
                .long("campaign")
                .help("run these feedback kinds side by side (comma separated)")
                .value_delimiter(',')
                .conflicts_with_all(["feedback", "scheduler"]),
        )
        .arg(
            Arg::new("time-limit")
                .long("time-limit")
                .help("stop after this many seconds")
                .value_parser(value_parser!(u64)),
        )
}

fn init_logging(sink: OutputSink, target: &str) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if sink == OutputSink::File {
        fs::create_dir_all(LOG_DIR).with_context(|| format!("cannot create `{LOG_DIR}`"))?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = Path::new(LOG_DIR).join(format!("{target}_{}_log.txt", &id[..6]));
        let file = File::create(&path)
            .with_context(|| format!("cannot create log file `{}`", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn config(matches: &ArgMatches) -> anyhow::Result<FuzzConfig> {
    let method = TestMethod::parse(
        string(matches, "test-method"),
        matches.get_one::<String>("algorithm").map(String::as_str),
    )?;
    let timeout = *matches.get_one::<f64>("timeout").unwrap_or(&0.0);
    if !(timeout.is_finite() && timeout > 0.0) {
        bail!("--timeout must be a positive number of seconds");
    }

    let mut config = FuzzConfig::new()
        .iterations(*matches.get_one::<usize>("iterations").unwrap_or(&DEFAULT_ITERATIONS))
        .feedback(string(matches, "feedback").parse()?)
        .method(method)
        .timeout(Duration::from_secs_f64(timeout));
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config = config.seed(seed);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("output-dir") {
        config = config.output_dir(dir);
    }
    config.validate()?;
    Ok(config)
}

fn string<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Ctrl-C stops `stop`; a second Ctrl-C exits.
fn install_interrupt_handler(stop: StopToken) -> anyhow::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("interrupted, finishing the current test (press Ctrl-C again to quit)");
        stop.stop();
    })
    .context("cannot install the Ctrl-C handler")
}

fn stop_after(stop: StopToken, limit: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(limit);
        log::info!("time limit of {limit:?} reached");
        stop.stop();
    });
}

fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    let name = string(&matches, "target");
    init_logging(string(&matches, "output").parse()?, name)?;

    let target = targets::by_name(name)?;
    let config = config(&matches)?;
    let mut rng = config.seed.map_or_else(Rng::from_entropy, Rng::new);
    let seeds = seeds::initial(
        &target,
        matches.get_one::<PathBuf>("corpus").map(PathBuf::as_path),
        matches.get_flag("use-multiple-graphs"),
        &mut rng,
    );
    let time_limit = matches
        .get_one::<u64>("time-limit")
        .map(|&secs| Duration::from_secs(secs));

    let stop = StopToken::new();
    install_interrupt_handler(stop.clone())?;

    if let Some(kinds) = matches.get_many::<String>("campaign") {
        let kinds = kinds
            .map(|kind| kind.parse::<FeedbackKind>())
            .collect::<graphfuzz::Result<Vec<_>>>()?;
        let mut campaign = Campaign::new(target, config)
            .feedbacks(kinds)
            .stop_token(stop);
        if let Some(limit) = time_limit {
            campaign = campaign.time_limit(limit);
        }
        let mut failure = None;
        for (kind, result) in campaign.run(seeds)? {
            match result {
                Ok(summary) => println!("== {kind} ==\n{summary}\n"),
                Err(e) => {
                    println!("== {kind} ==\nfailed: {e}\n");
                    failure.get_or_insert(e);
                }
            }
        }
        return match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        };
    }

    let folder = matches
        .get_one::<PathBuf>("folder")
        .map_or(Path::new("graphs_folder"), PathBuf::as_path);
    let scheduler = string(&matches, "scheduler")
        .parse::<SchedulerKind>()?
        .open(folder)?;
    let mut fuzzer = Fuzzer::new(target, config, scheduler)?.with_stop_token(stop.clone());
    if let Some(limit) = time_limit {
        stop_after(stop, limit);
    }
    let summary = fuzzer.run(seeds)?;
    println!("{summary}");
    Ok(())
}
