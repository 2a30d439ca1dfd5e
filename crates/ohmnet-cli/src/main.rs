//! ohmnet command-line interface.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use ohmnet_core::Quantity;
use ohmnet_core::units::format_quantity;
use ohmnet_parser::{ParseResult, parse};
use ohmnet_solver::{Board, SolveOptions, Source};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "ohmnet")]
#[command(about = "Equivalent resistance and current distribution of resistor networks", long_about = None)]
#[command(version)]
struct Cli {
    /// Input netlist file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Impose a voltage across the terminals, overriding `.source`
    #[arg(long, value_name = "U", allow_negative_numbers = true, conflicts_with = "current")]
    voltage: Option<f64>,

    /// Impose a current through the terminals, overriding `.source`
    #[arg(long, value_name = "I", allow_negative_numbers = true)]
    current: Option<f64>,

    /// Fail on parallel shorts and infinite or undefined readings
    #[arg(long)]
    strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    title: Option<String>,
    resistance: f64,
    expression: String,
    steps: Vec<String>,
    source: Option<SourceReport>,
    resistors: Vec<ResistorReport>,
}

#[derive(Debug, Serialize)]
struct SourceReport {
    unit: &'static str,
    amount: f64,
    voltage: f64,
    current: f64,
}

#[derive(Debug, Serialize)]
struct ResistorReport {
    name: String,
    resistance: f64,
    voltage: Option<f64>,
    current: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    let env = env_logger::Env::default()
        .filter("OHMNET_LOG")
        .write_style("OHMNET_LOG_STYLE");
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(default_level)
        .parse_env(env)
        .init();

    print!("{}", run(&cli)?);
    Ok(())
}

fn run(cli: &Cli) -> Result<String> {
    let parsed = load(&cli.input)?;
    let report = analyze(cli, parsed)?;
    if cli.json {
        let mut out = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        out.push('\n');
        Ok(out)
    } else {
        let mut out = String::new();
        render(&mut out, &report).context("failed to format report")?;
        Ok(out)
    }
}

fn load(path: &Path) -> Result<ParseResult> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read netlist: {}", path.display()))?;
    parse(&content).with_context(|| format!("failed to parse netlist: {}", path.display()))
}

/// Source from the command line, falling back to the netlist's `.source`.
fn select_source(cli: &Cli, parsed: &ParseResult) -> Result<Option<Source>> {
    match (cli.voltage, cli.current) {
        (Some(_), Some(_)) => bail!("--voltage and --current are mutually exclusive"),
        (Some(u), None) => Ok(Some(Source::Voltage(u))),
        (None, Some(i)) => Ok(Some(Source::Current(i))),
        (None, None) => parsed
            .source
            .map(|spec| Source::new(spec.quantity, spec.amount))
            .transpose()
            .context("invalid source"),
    }
}

fn analyze(cli: &Cli, parsed: ParseResult) -> Result<Report> {
    let source = select_source(cli, &parsed)?;
    let options = if cli.strict {
        SolveOptions::strict()
    } else {
        SolveOptions::default()
    };

    let title = parsed.title().map(str::to_string);
    let elements: Vec<(String, f64)> = parsed
        .schematic
        .resistors()
        .iter()
        .map(|r| (r.name.clone(), r.resistance()))
        .collect();
    let mut board = Board::with_options(parsed.schematic, options);
    let solution = board
        .calculate(source)
        .context("failed to solve the network")?;
    log::info!("reduced in {} steps", solution.steps.len());

    let resistors = elements
        .into_iter()
        .enumerate()
        .map(|(index, (name, resistance))| {
            let reading = solution.reading(index);
            ResistorReport {
                name,
                resistance,
                voltage: reading.map(|r| r.voltage),
                current: reading.map(|r| r.current),
            }
        })
        .collect();

    let source = source.and_then(|source| {
        Some(SourceReport {
            unit: source.quantity().unit(),
            amount: source.amount(),
            voltage: solution.voltage()?,
            current: solution.current()?,
        })
    });

    Ok(Report {
        title,
        resistance: solution.resistance(),
        expression: solution.expression(),
        steps: solution.steps.iter().map(ToString::to_string).collect(),
        source,
        resistors,
    })
}

fn render(out: &mut String, report: &Report) -> std::fmt::Result {
    writeln!(out, "Circuit: {}", report.title.as_deref().unwrap_or("(untitled)"))?;
    writeln!(
        out,
        "Equivalent resistance: {}",
        format_quantity(report.resistance, Quantity::Resistance)
    )?;
    writeln!(out, "Expression: {}", report.expression)?;

    let Some(source) = &report.source else {
        return Ok(());
    };
    writeln!(
        out,
        "Source: {} across, {} through",
        format_quantity(source.voltage, Quantity::Voltage),
        format_quantity(source.current, Quantity::Current)
    )?;
    writeln!(out)?;

    let width = report
        .resistors
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max(4);
    writeln!(out, "{:<width$}  {:>14}  {:>14}  {:>14}", "Name", "R", "U", "I")?;
    writeln!(out, "{}", "-".repeat(width + 48))?;
    for resistor in &report.resistors {
        let reading = |value: Option<f64>, quantity| {
            value.map_or_else(|| "-".to_string(), |v| format_quantity(v, quantity))
        };
        writeln!(
            out,
            "{:<width$}  {:>14}  {:>14}  {:>14}",
            resistor.name,
            format_quantity(resistor.resistance, Quantity::Resistance),
            reading(resistor.voltage, Quantity::Voltage),
            reading(resistor.current, Quantity::Current),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    const DIVIDER: &str = "\
.title divider
R1 a b 10
R2 b c 20
.terminals a c
.source V 12
";

    fn netlist(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn cli(path: &Path, extra: &[&str]) -> Cli {
        let mut args = vec!["ohmnet".to_string(), path.display().to_string()];
        args.extend(extra.iter().map(|s| s.to_string()));
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_text_report() {
        let file = netlist(DIVIDER);
        let out = run(&cli(file.path(), &[])).unwrap();
        assert!(out.contains("Circuit: divider"));
        assert!(out.contains("Equivalent resistance: 30.0000\u{2126}"));
        assert!(out.contains("Expression: +([10], [20])"));
        assert!(out.contains("400.0000mA"));
        assert!(out.contains("8.0000V"));
    }

    #[test]
    fn test_render_table() {
        let report = Report {
            title: None,
            resistance: 50.0,
            expression: ":([50], [inf])".to_string(),
            steps: vec!["parallel".to_string()],
            source: Some(SourceReport {
                unit: "V",
                amount: 5.0,
                voltage: 5.0,
                current: 0.1,
            }),
            resistors: vec![
                ResistorReport {
                    name: "R1".to_string(),
                    resistance: 50.0,
                    voltage: Some(5.0),
                    current: Some(0.1),
                },
                ResistorReport {
                    name: "Rsense".to_string(),
                    resistance: f64::INFINITY,
                    voltage: None,
                    current: None,
                },
            ],
        };
        let mut out = String::new();
        render(&mut out, &report).unwrap();
        assert!(out.starts_with("Circuit: (untitled)\n"));
        assert!(out.contains("Source: 5.0000V across, 100.0000mA through"));
        let last = out.lines().last().unwrap();
        assert!(last.starts_with("Rsense"));
        assert!(last.contains("inf\u{2126}"));
        assert!(last.trim_end().ends_with('-'));
    }

    #[test]
    fn test_json_report() {
        let file = netlist(DIVIDER);
        let out = run(&cli(file.path(), &["--json"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["resistance"], 30.0);
        assert_eq!(value["source"]["unit"], "V");
        assert_eq!(value["resistors"][1]["name"], "R2");
        let u2 = value["resistors"][1]["voltage"].as_f64().unwrap();
        assert!((u2 - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_source_override() {
        let file = netlist(DIVIDER);
        let out = run(&cli(file.path(), &["--json", "--current", "1"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["source"]["unit"], "A");
        let u = value["source"]["voltage"].as_f64().unwrap();
        assert!((u - 30.0).abs() < 1e-12);

        assert!(Cli::try_parse_from(["ohmnet", "x.net", "--voltage", "1", "--current", "1"]).is_err());
    }

    #[test]
    fn test_without_source() {
        let file = netlist("R1 a b 10\nR2 a b 10\n.terminals a b\n");
        let out = run(&cli(file.path(), &[])).unwrap();
        assert!(out.contains("5.0000\u{2126}"));
        assert!(!out.contains("Source:"));
    }

    #[test]
    fn test_strict_flag() {
        let file = netlist("R1 a b 0\nR2 a b 0\n.terminals a b\n");
        assert!(run(&cli(file.path(), &[])).is_ok());
        let err = run(&cli(file.path(), &["--strict"])).unwrap_err();
        assert!(format!("{:#}", err).contains("numeric degeneracy"));
    }

    #[test]
    fn test_errors_carry_context() {
        let missing = run(&cli(Path::new("/nonexistent/net.cir"), &[])).unwrap_err();
        assert!(missing.to_string().contains("failed to read netlist"));

        let file = netlist("X1 a b 1\n");
        let err = run(&cli(file.path(), &[])).unwrap_err();
        assert!(err.to_string().contains("failed to parse netlist"));
        assert!(format!("{:#}", err).contains("unknown element type: X1"));

        let file = netlist("R1 a b 1\n");
        let err = run(&cli(file.path(), &[])).unwrap_err();
        assert!(format!("{:#}", err).contains("no terminals specified"));
    }
}
