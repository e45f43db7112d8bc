use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use log::LevelFilter;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::process;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use ua_sha256_scan::{S3LogParser, Scanner, ScannerConfig};

fn build_cli() -> Command {
    Command::new("ua-sha256-scan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Classify User-Agent strings by likely SHA-256 certificate support")
        .long_about(
            "Classify User-Agent strings by likely SHA-256 certificate support.\n\n\
             Each result line is '<code> <name>' where code is:\n\
             \x20   0 = Supported\n\
             \x20   1 = Unknown support (may or may not be supported)\n\
             \x20   2 = Not supported\n\n\
             Input is taken from the command line, a file (--file), an S3 access\n\
             log (--s3-log), or one User-Agent per line on standard input.",
        )
        .arg(
            Arg::new("user-agent")
                .value_name("USER_AGENT")
                .help("User-Agent string; multiple arguments are joined with spaces")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Read one User-Agent per line from FILE")
                .conflicts_with_all(["user-agent", "s3-log"])
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("skip-count")
                .long("skip-count")
                .help("Drop the leading count column of each line (as written by 'uniq -c')")
                .requires("file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("s3-log")
                .long("s3-log")
                .value_name("FILE")
                .help("Read an S3 server access log and print '<bucket> <remote-ip> <result>'")
                .conflicts_with("user-agent")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("identify-unknown")
                .short('u')
                .long("identify-unknown")
                .help("Prefix results with T or F for identified or unidentified agents")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("raw")
                .short('r')
                .long("raw")
                .help("Append the decoded input to each result line")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print one JSON object per result")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("idle-timeout")
                .long("idle-timeout")
                .value_name("SECS")
                .help("Stop reading stdin after SECS seconds without input (0 waits forever)")
                .value_parser(clap::value_parser!(u64))
                .default_value("1"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    let mut cli = build_cli();
    let matches = cli.clone().get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    if let Err(e) = ctrlc::set_handler(|| {
        process::exit(0);
    }) {
        log::warn!("Failed to set Ctrl+C handler: {e}");
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e:#}");
                process::exit(1);
            }
        },
        None => ScannerConfig::default(),
    };

    if matches.get_flag("identify-unknown") {
        config.output.identify_unknown = true;
    }
    if matches.get_flag("raw") {
        config.output.verbose = true;
    }

    let scanner = match Scanner::new(config) {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    let json = matches.get_flag("json");
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = if let Some(path) = matches.get_one::<String>("s3-log") {
        scan_s3_log(&scanner, path, json, &mut out)
    } else if let Some(path) = matches.get_one::<String>("file") {
        scan_file(&scanner, path, matches.get_flag("skip-count"), json, &mut out)
    } else if let Some(args) = matches.get_many::<String>("user-agent") {
        let ua = args.map(String::as_str).collect::<Vec<_>>().join(" ");
        emit(&scanner, &ua, json, &mut out)
    } else if io::stdin().is_terminal() {
        cli.print_help().map_err(anyhow::Error::from)
    } else {
        let secs = matches.get_one::<u64>("idle-timeout").copied().unwrap_or(1);
        let timeout = (secs > 0).then(|| Duration::from_secs(secs));
        let stdin = BufReader::new(io::stdin());
        scan_stdin(&scanner, stdin, timeout, json, &mut out)
    };

    let result = result.and_then(|()| out.flush().map_err(Into::into));

    match result {
        Ok(()) => {}
        // A closed stdout (`... | head`) is a normal way to stop.
        Err(e) if is_broken_pipe(&e) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn load_config(path: &str) -> anyhow::Result<ScannerConfig> {
    if std::path::Path::new(path).exists() {
        ScannerConfig::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(ScannerConfig::default())
    }
}

fn generate_default_config(path: &str) {
    let config = ScannerConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

fn emit(scanner: &Scanner, ua: &str, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", scanner.classify(ua).to_json())?;
    } else {
        writeln!(out, "{}", scanner.classify_to_string(ua))?;
    }
    Ok(())
}

/// Strip the count column `uniq -c` puts in front of each line.
fn strip_count(line: &str) -> &str {
    line.trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

fn scan_file(
    scanner: &Scanner,
    path: &str,
    skip_count: bool,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;

    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("failed to read '{path}'"))?;
        let line = line.trim_end_matches('\r');
        let ua = if skip_count { strip_count(line) } else { line };
        log::debug!("input: {ua}");
        emit(scanner, ua, json, out)?;
    }

    Ok(())
}

fn scan_s3_log(
    scanner: &Scanner,
    path: &str,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let parser = S3LogParser::new()?;
    let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read '{path}'"))?;
        let Some(entry) = parser.parse_line(&line) else {
            log::debug!("skipping malformed line {}", number + 1);
            continue;
        };

        if json {
            let mut value = scanner.classify(&entry.user_agent).to_json_value();
            value["bucket"] = entry.bucket.into();
            value["remote_ip"] = entry.remote_ip.into();
            writeln!(out, "{value}")?;
        } else {
            writeln!(
                out,
                "{} {} {}",
                entry.bucket,
                entry.remote_ip,
                scanner.classify_to_string(&entry.user_agent)
            )?;
        }
    }

    Ok(())
}

/// One UA per line from stdin until EOF, or until no line arrives within
/// `idle_timeout` seconds.
fn scan_stdin<R>(
    scanner: &Scanner,
    input: R,
    idle_timeout: Option<Duration>,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<io::Result<String>>();

    thread::spawn(move || {
        for line in input.lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        let received = match idle_timeout {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(line) => {
                let line = line.context("failed to read standard input")?;
                let line = line.trim_end_matches('\r');
                emit(scanner, line, json, out)?;
                out.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {
                log::debug!("no input for {idle_timeout:?}, stopping");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
