// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod upload;

use anyhow::Context;
use blinkwire_config::{
    Assertion, BoardConfig, Limits, Scenario, StopReason, MAX_UART_FIFO_DEPTH,
};
use blinkwire_core::bus::SystemBus;
use blinkwire_core::check::check_all;
use blinkwire_core::{BeaconOptions, Budget, Machine, RunReport, SimHardware};
use blinkwire_hal::delay::DEFAULT_DELAY;
use blinkwire_hal::Beacon;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "Blinkwire RP2040 beacon simulator", long_about = None)]
struct Cli {
    /// Enable debug logging (pin changes, peripheral mapping, halts)
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the beacon firmware against the simulated board.
    Run(RunArgs),

    /// Deterministic, CI-friendly runner mode driven by a scenario (YAML).
    Test(TestArgs),

    /// Write a program-upload frame for the serial loader.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Number of beacon phases (delays) to run
    #[arg(long, default_value = "20")]
    phases: u64,

    /// Spin count per phase
    #[arg(long, default_value_t = DEFAULT_DELAY)]
    delay: u32,

    /// Program UART0 before entering the loop
    #[arg(long)]
    uart_init: bool,

    /// Hold UART output until UARTEN and TXE are set
    #[arg(long)]
    require_uart_enable: bool,

    /// TX FIFO depth used when UARTLCRH.FEN is set
    #[arg(long, default_value_t = MAX_UART_FIFO_DEPTH)]
    fifo_depth: usize,

    /// Use the full FIFO depth even with UARTLCRH.FEN clear
    #[arg(long)]
    fifo_enabled: bool,

    /// Bus cycles per transmitted byte; 0 keeps the line stalled
    #[arg(long, default_value = "8")]
    drain_interval: u32,

    /// Consecutive reads of one register before the run counts as stalled
    #[arg(long)]
    max_polls: Option<u64>,

    /// Write the bus trace as JSON lines
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the scenario (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Disable UART stdout echo (still captured for assertions/artifacts)
    #[arg(long)]
    no_uart_stdout: bool,

    /// Directory to write test artifacts (result.json, uart.log)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override the scenario's phase limit
    #[arg(long)]
    max_phases: Option<u64>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Raw program image
    #[arg(short, long)]
    image: PathBuf,

    /// Write the frame to a file instead of a serial port
    #[arg(short, long, conflicts_with = "port", required_unless_present = "port")]
    output: Option<PathBuf>,

    /// Serial port of the loader (e.g. /dev/ttyACM0)
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Pause between keyword, size and data, in milliseconds
    #[arg(long, default_value = "50")]
    gap_ms: u64,

    /// How long to log device output before and after the upload, in milliseconds
    #[arg(long, default_value = "2000")]
    listen_ms: u64,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    stop_reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<Limits>,
    /// Final register state of every mapped peripheral.
    #[serde(skip_serializing_if = "Option::is_none")]
    peripherals: Option<serde_json::Value>,
    assertions: Vec<AssertionResult>,
    scenario_hash: String,
    config: TestConfig,
}

#[derive(Debug, Serialize, Clone)]
struct AssertionResult {
    assertion: Assertion,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct TestConfig {
    script: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run_interactive(args),
        Commands::Test(args) => run_test(args),
        Commands::Frame(args) => run_frame(args),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn is_fault(reason: StopReason) -> bool {
    matches!(
        reason,
        StopReason::MemoryViolation | StopReason::UnalignedAccess
    )
}

fn run_interactive(args: RunArgs) -> ExitCode {
    info!("Starting Blinkwire Simulator");

    let board = BoardConfig {
        uart_fifo_depth: args.fifo_depth,
        uart_fifo_enabled: args.fifo_enabled,
        uart_drain_interval: (args.drain_interval != 0).then_some(args.drain_interval),
        require_uart_enable: args.require_uart_enable,
        gpio_oe_reset: 0,
    };
    if board.uart_fifo_depth == 0 || board.uart_fifo_depth > MAX_UART_FIFO_DEPTH {
        error!(
            "--fifo-depth must be between 1 and {}",
            MAX_UART_FIFO_DEPTH
        );
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }
    if args.phases == 0 || args.max_polls == Some(0) {
        error!("--phases and --max-polls must be greater than zero");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let budget = Budget::phases(args.phases).with_max_polls(args.max_polls);
    let hw = SimHardware::new(SystemBus::from_config(&board), budget);
    let mut machine = Machine::with_uart_echo(hw, true);
    let beacon = Beacon::pico().with_delay(args.delay);
    let report = machine.run(
        &beacon,
        BeaconOptions {
            uart_init: args.uart_init,
        },
    );
    println!();

    if let Some(detail) = &report.stop_detail {
        info!("Stop detail: {}", detail);
    }
    info!("UART bytes sent: {}", report.uart_tx.len());
    if report.overrun_writes > 0 {
        tracing::warn!("UART overrun writes: {}", report.overrun_writes);
    }

    if let Some(path) = &args.trace_out {
        if let Err(e) = write_trace(path, &machine) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
        info!("Bus trace written to {:?}", path);
    }

    if is_fault(report.stop_reason) {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::from(EXIT_PASS)
    }
}

fn write_trace(path: &Path, machine: &Machine) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create trace file {:?}", path))?;
    machine
        .trace()
        .write_jsonl(std::io::BufWriter::new(file))
        .with_context(|| format!("Failed to write trace file {:?}", path))
}

fn run_test(args: TestArgs) -> ExitCode {
    let scenario_bytes = match std::fs::read(&args.script) {
        Ok(b) => b,
        Err(e) => {
            let msg = format!("Failed to read scenario {:?}: {}", args.script, e);
            error!("{}", msg);
            write_config_error_outputs(&args, None, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let scenario_hash = sha256_hex(&scenario_bytes);

    let scenario = match std::str::from_utf8(&scenario_bytes)
        .context("Scenario is not valid UTF-8")
        .and_then(Scenario::from_yaml)
    {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, Some(scenario_hash), msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut limits = scenario.limits.clone();
    if let Some(max_phases) = args.max_phases {
        if max_phases == 0 {
            let msg = "--max-phases must be greater than zero".to_string();
            error!("{}", msg);
            write_config_error_outputs(&args, Some(scenario_hash), msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
        limits.max_phases = max_phases;
    }

    // Validated by Scenario::from_yaml.
    let trace_limit = limits.trace_event_limit().unwrap_or(None);

    let hw = SimHardware::new(
        SystemBus::from_config(&scenario.board),
        Budget::from(&limits),
    )
    .with_trace_limit(trace_limit);
    let mut machine = Machine::with_uart_echo(hw, !args.no_uart_stdout);
    let beacon = Beacon::pico().with_delay(scenario.firmware.delay);
    let report = machine.run(
        &beacon,
        BeaconOptions {
            uart_init: scenario.firmware.uart_init,
        },
    );

    let assertions: Vec<AssertionResult> = scenario
        .assertions
        .iter()
        .map(|a| evaluate_assertion(a, &report, &machine, &beacon))
        .collect();

    let stop_expected = scenario.assertions.iter().any(|a| {
        matches!(
            a,
            Assertion::ExpectedStopReason(e) if e.expected_stop_reason == report.stop_reason
        )
    });
    let all_passed = assertions.iter().all(|a| a.passed);

    let (status, code, message) = if is_fault(report.stop_reason) && !stop_expected {
        ("error", EXIT_RUNTIME_ERROR, report.stop_detail.clone())
    } else if all_passed {
        ("pass", EXIT_PASS, None)
    } else {
        ("fail", EXIT_ASSERT_FAIL, None)
    };

    for result in &assertions {
        if !result.passed {
            error!(
                "Assertion failed: {:?}{}",
                result.assertion,
                result
                    .message
                    .as_deref()
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default()
            );
        }
    }
    info!("Test status: {}", status);

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        stop_reason: report.stop_reason,
        message,
        report: Some(report),
        limits: Some(limits),
        peripherals: Some(machine.hardware().bus().snapshot()),
        assertions,
        scenario_hash,
        config: TestConfig {
            script: args.script.clone(),
        },
    };
    write_outputs(&args, &result, &machine.uart_bytes());

    ExitCode::from(code)
}

fn evaluate_assertion(
    assertion: &Assertion,
    report: &RunReport,
    machine: &Machine,
    beacon: &Beacon,
) -> AssertionResult {
    let (passed, message) = match assertion {
        Assertion::UartContains(a) => (report.uart_tx.contains(&a.uart_contains), None),
        Assertion::ExpectedStopReason(a) => {
            (report.stop_reason == a.expected_stop_reason, None)
        }
        Assertion::MinLedTransitions(a) => (
            report.led_transitions >= a.min_led_transitions,
            Some(format!("observed {}", report.led_transitions)),
        ),
        Assertion::Properties(a) if a.properties => {
            let violations = check_all(machine.trace(), beacon);
            let message = (!violations.is_empty()).then(|| {
                violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            });
            (violations.is_empty(), message)
        }
        Assertion::Properties(_) => (true, None),
    };
    AssertionResult {
        assertion: assertion.clone(),
        passed,
        message,
    }
}

fn write_outputs(args: &TestArgs, result: &TestResult, uart_bytes: &[u8]) {
    let Some(output_dir) = &args.output_dir else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }

    // result.json
    let result_path = output_dir.join("result.json");
    match std::fs::File::create(&result_path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, result) {
                error!("Failed to write result.json: {}", e);
            }
        }
        Err(e) => error!("Failed to create result.json: {}", e),
    }

    // uart.log
    let uart_path = output_dir.join("uart.log");
    if let Err(e) = std::fs::write(&uart_path, uart_bytes) {
        error!("Failed to write uart.log: {}", e);
    }
}

fn write_config_error_outputs(args: &TestArgs, scenario_hash: Option<String>, message: String) {
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "error".to_string(),
        stop_reason: StopReason::ConfigError,
        message: Some(message),
        report: None,
        limits: None,
        peripherals: None,
        assertions: Vec::new(),
        scenario_hash: scenario_hash.unwrap_or_default(),
        config: TestConfig {
            script: args.script.clone(),
        },
    };
    write_outputs(args, &result, b"");
}

fn run_frame(args: FrameArgs) -> ExitCode {
    match send_image(&args) {
        Ok(()) => ExitCode::from(EXIT_PASS),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn send_image(args: &FrameArgs) -> anyhow::Result<()> {
    let image = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read image {:?}", args.image))?;
    info!("Image: {:?} ({} bytes)", args.image, image.len());
    info!("Image sha256: {}", sha256_hex(&image));

    match (&args.port, &args.output) {
        (Some(port), _) => upload_serial(port, args, &image),
        (None, Some(path)) => {
            std::fs::write(path, upload::encode_frame(&image))
                .with_context(|| format!("Failed to write frame to {:?}", path))?;
            info!("Frame written to {:?}", path);
            Ok(())
        }
        (None, None) => anyhow::bail!("Either --port or --output is required"),
    }
}

fn upload_serial(port_name: &str, args: &FrameArgs, image: &[u8]) -> anyhow::Result<()> {
    let mut port = serialport::new(port_name, args.baud)
        .timeout(upload::READ_TIMEOUT)
        .open()
        .with_context(|| {
            format!(
                "Failed to open serial port {} at {} baud",
                port_name, args.baud
            )
        })?;
    let mut reader = port
        .try_clone()
        .with_context(|| format!("Failed to clone serial port {}", port_name))?;
    info!("Opened {} at {} baud", port_name, args.baud);

    let stop = Arc::new(AtomicBool::new(false));
    let logger = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || upload::monitor(&mut reader, &stop, &mut std::io::stdout()))
    };

    let listen = Duration::from_millis(args.listen_ms);
    info!("Logging serial output for {} ms", args.listen_ms);
    thread::sleep(listen);

    let sent = upload::send_frame(&mut port, image, Duration::from_millis(args.gap_ms));
    if sent.is_ok() {
        info!("Logging serial output for {} more ms", args.listen_ms);
        thread::sleep(listen);
    }

    stop.store(true, Ordering::Relaxed);
    let received = logger
        .join()
        .map_err(|_| anyhow::anyhow!("Serial logger thread panicked"))?;
    sent.with_context(|| format!("Failed to send frame to {}", port_name))?;
    let received = received.with_context(|| format!("Failed to read from {}", port_name))?;
    info!("Received {} bytes from the device", received);
    Ok(())
}
