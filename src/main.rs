use clap::Parser as _;
use color_eyre::eyre::{Context, Result};

use roslaunch::build_info::BUILD_INFO;
use roslaunch::cli::{Args, Config, RequestMode};
use roslaunch::logdir::LogDir;
use roslaunch::logging::Telemetry;
use roslaunch::orchestrator::{LaunchRequest, Orchestrator};
use roslaunch::substitution::pkg_locator::PackageLocator;

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config = args.into_config().wrap_err("invalid command line")?;

    Telemetry::new().verbose(config.verbose).init();
    tracing::debug!(version = BUILD_INFO.version, git = BUILD_INFO.git_describe, "starting roslaunch");

    if let Some(mode) = &config.request_mode {
        return run_request_mode(mode, &config);
    }

    run_launch(config)
}

/// Request modes (`--files`/`--nodes`/`--find-node`/`--args`/
/// `--ros-args`/`--dump-params`) print something and exit without
/// spawning anything (§6).
fn run_request_mode(mode: &RequestMode, config: &Config) -> Result<()> {
    match mode {
        RequestMode::Files => {
            for file in &config.files {
                println!("{}", file.display());
            }
        }
        RequestMode::Nodes | RequestMode::DumpParams | RequestMode::RosArgs => {
            let locator = package_locator();
            let assembled = compile_and_assemble(config, &locator)?;
            match mode {
                RequestMode::Nodes => {
                    for node in &assembled.nodes {
                        println!("{}", node.resolved_name);
                    }
                }
                RequestMode::DumpParams => {
                    for param in &assembled.params {
                        println!("{}: {:?}", param.name, param.value);
                    }
                }
                RequestMode::RosArgs => {
                    for node in &assembled.nodes {
                        println!("{} {} {}", node.resolved_name, node.tag.pkg, node.tag.node_type);
                    }
                }
                _ => unreachable!(),
            }
        }
        RequestMode::FindNode(name) => {
            let locator = package_locator();
            let assembled = compile_and_assemble(config, &locator)?;
            match assembled.nodes.iter().find(|n| n.tag.name == *name) {
                Some(node) => println!("{}", node.source_file.display()),
                None => return Err(color_eyre::eyre::eyre!("no such node '{name}'")),
            }
        }
        RequestMode::Args(name) => {
            let locator = package_locator();
            let _ = compile_and_assemble(config, &locator)?;
            match config.cli_args.get(name) {
                Some(value) => println!("{value}"),
                None => return Err(color_eyre::eyre::eyre!("no such arg '{name}'")),
            }
        }
    }
    Ok(())
}

fn compile_and_assemble(
    config: &Config,
    locator: &PackageLocator,
) -> Result<roslaunch::assembler::Assembled> {
    let anon = roslaunch::substitution::anon::AnonRegistry::new();
    let mut warnings = roslaunch::tags::Warnings::default();
    let mut nodes = Vec::new();
    let mut tests = Vec::new();
    let mut params = Vec::new();
    let mut rosparams = Vec::new();
    let mut clear_params = Vec::new();
    let mut machines = Vec::new();

    for file in &config.files {
        let mut compiler = roslaunch::compiler::Compiler::new(locator, &anon, &mut warnings);
        let tree = compiler.compile_root(file, &config.cli_args)?;
        let assembled = roslaunch::assembler::assemble(&tree)?;
        nodes.extend(assembled.nodes);
        tests.extend(assembled.tests);
        params.extend(assembled.params);
        rosparams.extend(assembled.rosparams);
        clear_params.extend(assembled.clear_params);
        machines.extend(assembled.machines);
    }

    Ok(roslaunch::assembler::Assembled { nodes, tests, params, rosparams, machines, clear_params })
}

fn package_locator() -> PackageLocator {
    std::env::var(roslaunch::consts::env_vars::ROS_PACKAGE_PATH)
        .map(|path| PackageLocator::from_search_path(&path))
        .unwrap_or_else(|_| PackageLocator::new(Vec::new()))
}

fn run_launch(config: Config) -> Result<()> {
    let run_id = config.run_id.clone().unwrap_or_else(roslaunch::bootstrap::generate_run_id);
    let mut log_dir = LogDir::create(&run_id, config.pid_file.clone(), config.skip_log_check)
        .wrap_err("failed to set up the log directory")?;

    roslaunch::title::set(&run_id, config.disable_title);

    let request = LaunchRequest {
        files: config.files.clone(),
        cli_args: config.cli_args.clone(),
        server_uri: config.server_uri.clone(),
        port: config.port,
        numworkers: config.numworkers,
        wait: config.wait,
        run_id: run_id.clone(),
        force_screen: config.force_screen,
        log_dir: log_dir.path().to_path_buf(),
        package_path: package_locator(),
        launcher_binary: std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "roslaunch".to_string()),
    };

    let result = Orchestrator::launch(&request).wrap_err("failed to launch");
    roslaunch::title::clear(config.disable_title);

    let orchestrator = match result {
        Ok(o) => o,
        Err(e) => {
            log_dir.cleanup();
            return Err(e);
        }
    };

    let shutdown = orchestrator.shutdown_handle();
    ctrlc_shutdown(shutdown);

    orchestrator.run();
    log_dir.cleanup();
    Ok(())
}

/// Process-wide because a signal handler can't capture anything; a
/// background thread bridges it to the orchestrator's own shutdown
/// flag (§5 "a shutdown signal raises the termination flag that the
/// main loop observes and exits on next iteration").
static SIGNAL_RECEIVED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

extern "C" fn handle_termination_signal(_: libc::c_int) {
    SIGNAL_RECEIVED.store(true, std::sync::atomic::Ordering::SeqCst);
}

fn ctrlc_shutdown(flag: std::sync::Arc<std::sync::atomic::AtomicBool>) {
    unsafe {
        libc::signal(libc::SIGINT, handle_termination_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_termination_signal as libc::sighandler_t);
    }
    std::thread::spawn(move || {
        while !SIGNAL_RECEIVED.load(std::sync::atomic::Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });
}
