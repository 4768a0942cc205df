use anyhow::Context;
use clap::{Parser, Subcommand};
use drkonqi_harness::bugzilla::{MockBugzilla, RouteTable};
use drkonqi_harness::{HarnessConfig, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "drkonqi-harness", version, about = "Integration harness for the DrKonqi crash reporting assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the configured binaries exist
    Check,
    /// Run only the mock Bugzilla server until the attachment comment arrives
    Serve {
        /// Directory with product.json, bugs.json and comments.json
        #[arg(long)]
        fixtures: Option<PathBuf>,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
    /// Start bus, server, tracee and assistant, drive the report through, and check it was attached
    Launch {
        #[arg(long)]
        fixtures: Option<PathBuf>,
        #[arg(long, default_value_t = 600)]
        timeout: u64,
        /// Leave the clicking to a person and only wait for the comment
        #[arg(long)]
        manual: bool,
    },
}

fn check() -> anyhow::Result<bool> {
    let config = HarnessConfig::from_env()?;
    println!("drkonqi:             {}", config.assistant_path.display());
    println!("at-spi bus launcher: {}", describe(&config.bus_launcher_path));
    println!("at-spi registry:     {}", describe(&config.registry_path));
    config.validate()?;
    println!("ok");
    Ok(true)
}

fn describe(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set, using the running bus)".to_string())
}

fn serve(fixtures: Option<PathBuf>, timeout: Duration) -> anyhow::Result<bool> {
    let config = HarnessConfig {
        fixtures_dir: fixtures,
        ..Default::default()
    };
    let routes = RouteTable::duplicate_attach(&config.expectations, &config.fixtures()?);
    let server = MockBugzilla::start(routes, config.unexpected_requests)?;
    println!("DRKONQI_KDE_BUGZILLA_URL={}", server.url());

    let start = Instant::now();
    while !server.comment_sent() && start.elapsed() < timeout {
        std::thread::sleep(Duration::from_millis(200));
    }
    let received = server.comment_sent();
    println!("comment received: {}", received);
    server.shutdown();
    Ok(received)
}

fn launch(fixtures: Option<PathBuf>, timeout: Duration, manual: bool) -> anyhow::Result<bool> {
    let mut config = HarnessConfig::from_env()?;
    config.fixtures_dir = fixtures;
    let mut session = Session::start(config).context("failed to start session")?;
    if let Some(server) = session.server() {
        println!("mock bugzilla at {}", server.url());
    }
    let verdict = if manual {
        session.wait_for_comment(timeout)
    } else {
        drive(&mut session)
    };
    session.teardown();
    match verdict {
        Ok(()) => Ok(true),
        Err(e) => {
            eprintln!("{} ({:?} failure)", e, e.class());
            Ok(false)
        }
    }
}

#[cfg(feature = "atspi")]
fn drive(session: &mut Session) -> drkonqi_harness::Result<()> {
    use drkonqi_harness::a11y::AtspiDesktop;

    // the bus launcher may still be coming up
    let config = session.config();
    let mut attempts = config.discovery_attempts;
    let desktop = loop {
        match AtspiDesktop::connect() {
            Ok(desktop) => break desktop,
            Err(e) if attempts > 1 => {
                log::warn!("accessibility bus not ready: {}", e);
                attempts -= 1;
                std::thread::sleep(config.poll_interval);
            }
            Err(e) => return Err(e),
        }
    };
    session.run(&desktop)
}

#[cfg(not(feature = "atspi"))]
fn drive(_session: &mut Session) -> drkonqi_harness::Result<()> {
    Err(drkonqi_harness::Error::ConfigError(
        "built without the atspi feature; rebuild with it or pass --manual".into(),
    ))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check => check(),
        Command::Serve { fixtures, timeout } => serve(fixtures, Duration::from_secs(timeout)),
        Command::Launch {
            fixtures,
            timeout,
            manual,
        } => launch(fixtures, Duration::from_secs(timeout), manual),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
