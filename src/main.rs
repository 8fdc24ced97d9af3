use clap::Parser;
use rusty_logic::persistence::{JsonRamDump, DEFAULT_DUMP_PATH};
use rusty_logic::system_config::CircuitFactory;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(name = "rusty_logic")]
#[command(about = "Gate-level circuit simulator driven by JSON circuit descriptions")]
struct Args {
    /// JSON circuit description
    config: PathBuf,

    /// Logical-time ticks to run after settling
    #[arg(long, default_value = "16")]
    steps: u64,

    /// Where non-volatile RAM contents are kept
    #[arg(long, default_value = DEFAULT_DUMP_PATH)]
    ram_dump: PathBuf,

    /// Print every bus after the run
    #[arg(long)]
    dump_buses: bool,
}

fn main() -> ExitCode {
    clilog::init_stderr_color_debug();
    let args = Args::parse();

    let factory = CircuitFactory::with_ram_store(Rc::new(JsonRamDump::new(&args.ram_dump)));
    let mut system = match factory.create_from_json(&args.config) {
        Ok(system) => system,
        Err(e) => {
            clilog::error!("Failed to build circuit from {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let info = system.info();
    println!("Circuit: {}", info.name);
    if !info.description.is_empty() {
        println!("  {}", info.description);
    }
    println!("  Components: {}", info.component_count);
    println!("  Buses: {}", info.bus_count);
    println!();

    if let Err(e) = system.run(args.steps) {
        clilog::error!("Simulation stopped: {}", e);
        return ExitCode::FAILURE;
    }

    println!();
    println!("Finished at t = {}", system.circuit().time());
    if args.dump_buses {
        for (_, bus) in system.circuit().buses() {
            println!("  {}", bus);
        }
    }
    ExitCode::SUCCESS
}
