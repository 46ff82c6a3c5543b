use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use ls8_ensemble::err::Error;
use ls8_ensemble::parse::load_file;
use ls8_ensemble::sim::mem::MachineInitStrategy;
use ls8_ensemble::sim::{SimFlags, Simulator};

/// LS-8 emulator
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Program to execute (one binary byte per line)
    program: PathBuf,

    /// Print the machine state to stderr before every instruction
    #[arg(long)]
    trace: bool,

    /// Stop after executing this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Fill memory with seeded random values instead of zeroes
    #[arg(long)]
    seed: Option<u64>,

    /// Log verbosity (off, error, warn, info, debug, trace)
    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
}

fn report(e: &impl Error) {
    eprintln!("error: {e}");
    if let Some(help) = e.help() {
        eprintln!("help: {help}");
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = SimpleLogger::new().with_level(args.log_level).init() {
        eprintln!("could not initialize logging: {e}");
    }

    let program = match load_file(&args.program) {
        Ok(p) => p,
        Err(e) => {
            report(&e);
            return ExitCode::from(2);
        }
    };

    let machine_init = match args.seed {
        Some(seed) => MachineInitStrategy::Seeded { seed },
        None => MachineInitStrategy::default(),
    };
    let mut sim = Simulator::new(SimFlags { machine_init });
    sim.load_program(&program);

    let start = sim.instructions_run;
    let max_steps = args.max_steps.unwrap_or(u64::MAX);
    let result = sim.run_while(|sim| {
        if sim.instructions_run.wrapping_sub(start) >= max_steps {
            return false;
        }
        if args.trace {
            eprintln!("{}", sim.trace());
        }
        true
    });

    match result {
        Ok(()) if sim.hit_halt() => ExitCode::SUCCESS,
        Ok(()) => {
            eprintln!("error: stopped after {} instructions without halting (PC = 0x{:02X})", sim.instructions_run, sim.pc);
            ExitCode::FAILURE
        },
        Err(e) => {
            report(&e);
            log::debug!("machine state at failure: {}", sim.trace());
            ExitCode::FAILURE
        }
    }
}
