use memsim::{Algorithm, MemoryRegion, ProcessId, RetryPolicy, Workload, WorkloadEvent};

use std::str::FromStr;
use anyhow::{anyhow, Result};
use log::info;
use thiserror::Error;

/// Default region capacity in KB when no '--capacity' flag is
/// given.
const DEFAULT_CAPACITY: u32 = 1024;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Global flags shared by every command of an invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Options {
    capacity: u32,
    retry: RetryPolicy,
    seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            retry: RetryPolicy::default(),
            seed: None,
        }
    }
}

/// One operation applied to the region. An invocation may
/// chain several, each followed by a snapshot on stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Status,
    Allocate { size: u32, algorithm: Algorithm },
    Deallocate { owner: ProcessId },
    Partition,
    TagFragments { threshold: u32 },
    ClearFragments,
    Simulate { steps: u32 },
    Reset,
}

pub fn run(args: &[String]) -> Result<()> {
    let (options, commands) = parse(args)?;
    execute(options, &commands)
}

/// Splits the arguments into global options and an ordered
/// command list. Option flags may appear anywhere; command
/// flags apply in the order given, and '--algorithm' refines
/// the '--allocate' just before it.
fn parse(args: &[String]) -> Result<(Options, Vec<Command>)> {
    let mut options = Options::default();
    let mut commands = Vec::new();

    let mut index = 0;
    while index < args.len() {
        let arg = args[index].as_str();
        match arg {
            "--capacity" => {
                let value = take_value(args, &mut index, arg)?;
                options.capacity = parse_number(value, "capacity")?;
                if options.capacity == 0 {
                    return Err(anyhow!(UsageError(
                        "Region capacity must be positive.".into()
                    )));
                }
            }
            "--retry-policy" => {
                let value = take_value(args, &mut index, arg)?;
                options.retry = parse_retry(value)?;
            }
            "--seed" => {
                let value = take_value(args, &mut index, arg)?;
                options.seed = Some(parse_number(value, "seed")?);
            }
            "--status" => commands.push(Command::Status),
            "--allocate" => {
                let value = take_value(args, &mut index, arg)?;
                let size = parse_number(value, "size")?;
                if size == 0 {
                    return Err(anyhow!(UsageError(
                        "Allocation size must be positive.".into()
                    )));
                }
                commands.push(Command::Allocate {
                    size,
                    algorithm: Algorithm::FirstFit,
                });
            }
            "--algorithm" => {
                let value = take_value(args, &mut index, arg)?;
                let Some(Command::Allocate { algorithm, .. }) = commands.last_mut() else {
                    return Err(anyhow!(UsageError(
                        "'--algorithm' must follow '--allocate'.".into()
                    )));
                };
                *algorithm = Algorithm::parse(value);
            }
            "--deallocate" => {
                let value = take_value(args, &mut index, arg)?;
                let owner = parse_number(value, "process id")?;
                commands.push(Command::Deallocate { owner });
            }
            "--partition" => commands.push(Command::Partition),
            "--tag-fragments" => {
                let value = take_value(args, &mut index, arg)?;
                let threshold = parse_number(value, "threshold")?;
                commands.push(Command::TagFragments { threshold });
            }
            "--clear-fragments" => commands.push(Command::ClearFragments),
            "--simulate" => {
                let value = take_value(args, &mut index, arg)?;
                let steps = parse_number(value, "step count")?;
                commands.push(Command::Simulate { steps });
            }
            "--reset" => commands.push(Command::Reset),
            _ => {
                return Err(anyhow!(UsageError(format!(
                    "Unknown argument '{}'.",
                    arg
                ))));
            }
        }
        index += 1;
    }

    // An invocation without commands just reports the state,
    // like an explicit '--status'.
    if commands.is_empty() {
        commands.push(Command::Status);
    }

    Ok((options, commands))
}

/// Runs the commands against a fresh region, printing the
/// snapshot after each one so a caller can follow the state
/// step by step. Logs go to stderr, so stdout stays valid
/// JSON.
fn execute(options: Options, commands: &[Command]) -> Result<()> {
    let mut region = MemoryRegion::new(options.capacity).with_retry_policy(options.retry);
    let mut workload: Option<Workload> = None;

    for command in commands {
        match *command {
            Command::Status => (),
            Command::Allocate { size, algorithm } => {
                region.allocate(size, algorithm);
            }
            Command::Deallocate { owner } => region.deallocate(owner),
            Command::Partition => {
                region.carve_partitions();
            }
            Command::TagFragments { threshold } => {
                region.tag_fragments(threshold);
            }
            Command::ClearFragments => {
                region.clear_fragments();
            }
            Command::Simulate { steps } => {
                let workload = workload.get_or_insert_with(|| match options.seed {
                    Some(seed) => Workload::seeded(seed),
                    None => Workload::new(),
                });

                let events = workload.run(&mut region, steps);
                let requests = events
                    .iter()
                    .filter(|event| matches!(event, WorkloadEvent::Requested { .. }))
                    .count();
                let releases = events
                    .iter()
                    .filter(|event| matches!(event, WorkloadEvent::Released { .. }))
                    .count();
                info!(
                    "Simulated {} steps: {} requests, {} releases.",
                    steps, requests, releases
                );
            }
            Command::Reset => region.reset(),
        }

        println!("{}", serde_json::to_string_pretty(&region.snapshot())?);
    }

    Ok(())
}

/// Consumes the value following a flag, or reports which flag
/// was left dangling.
fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!(UsageError(format!("Expected a value after '{}'.", flag))))
}

fn parse_number<T: FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!(UsageError(format!("Invalid {} '{}'.", what, value))))
}

fn parse_retry(token: &str) -> Result<RetryPolicy> {
    match token {
        "head-only" => Ok(RetryPolicy::HeadOnly),
        "full-queue" => Ok(RetryPolicy::FullQueue),
        _ => Err(anyhow!(UsageError(format!(
            "Unknown retry policy '{}'.",
            token
        )))),
    }
}
