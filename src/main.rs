use clap::{Arg, ArgAction, Command};
use std::io::{self, Write};
use std::process;

use cpscan::{
    config::ScanConfig,
    output::{OutputConfig, OutputFormat, OutputManager},
    Protocol, ScanEngine, ScanError, ScanSummary,
};

fn build_cli() -> Command {
    Command::new("cpscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sequential connect-based TCP/UDP port scanner")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Domain name or IPv4 address to scan")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_names(["START", "END"])
                .help("Scan ports within a closed range (default 1 1024)")
                .num_args(2)
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("proto")
                .long("proto")
                .value_name("PROTOCOL")
                .help("The protocol to probe with")
                .value_parser(["tcp", "udp"]),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Per-port timeout in milliseconds (1 or less uses 200)")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("dbg")
                .long("dbg")
                .help("Show debug information such as closed ports")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Write one JSON object per probed port")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (default ~/.cpscan.toml)"),
        )
}

fn apply_overrides(mut config: ScanConfig, matches: &clap::ArgMatches) -> ScanConfig {
    if let Some(ports) = matches.get_many::<u32>("ports") {
        let ports: Vec<u32> = ports.copied().collect();
        if let [start, end] = ports[..] {
            config = config.with_ports(start, end);
        }
    }
    if let Some(proto) = matches.get_one::<String>("proto") {
        if let Ok(protocol) = proto.parse::<Protocol>() {
            config = config.with_protocol(protocol);
        }
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(timeout);
    }
    if matches.get_flag("dbg") {
        config = config.with_debug(true);
    }
    if matches.get_flag("json") {
        config.format = OutputFormat::Json;
    }
    if matches.get_flag("no-color") {
        config.colored = false;
    }
    config
}

fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::from_toml_file(path)?,
        None => ScanConfig::load_default_config(),
    };
    let config = apply_overrides(config, &matches);

    let default_filter = if config.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let target = matches
        .get_one::<String>("target")
        .cloned()
        .unwrap_or_default();

    let request = match config.to_request(target) {
        Ok(request) => request,
        Err(ScanError::PortRangeError(msg)) => {
            eprintln!("[{}]", msg);
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let colored = config.colored && config.format == OutputFormat::Text;
    if !colored {
        colored::control::set_override(false);
    }
    let output = OutputManager::new(OutputConfig {
        format: config.format,
        colored,
        debug: config.debug,
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    output.write_line(&mut out, output.resolving_line())?;

    let engine = ScanEngine::system();
    let scan = match engine.scan(request) {
        Ok(scan) => scan,
        Err(e) if e.is_resolution_failure() => {
            log::debug!("{} (os code {:?})", e, e.os_code());
            output.write_line(&mut out, Some(output.resolution_failure_line()))?;
            out.flush()?;
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    output.write_line(&mut out, output.resolved_line(scan.target()))?;

    let mut summary = ScanSummary::new();
    for outcome in scan {
        summary.record(&outcome);
        output.write_outcome(&mut out, &outcome)?;
    }
    output.write_line(&mut out, output.summary_line(&summary))?;
    out.flush()?;

    Ok(())
}
