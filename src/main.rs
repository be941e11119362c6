use std::process::ExitCode;

use tms6100_emu::console::run_console;
use tms6100_emu::system_config::SystemFactory;

const USAGE: &str = "Usage:
  tms6100-emu <config.json> dump <address> <count>
  tms6100-emu <config.json> console";

fn parse_number(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command) = match args.as_slice() {
        [config, command, ..] => (config, command.as_str()),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    let factory = SystemFactory::new();
    let configured = match factory.create_from_json(config_path) {
        Ok(configured) => configured,
        Err(e) => {
            eprintln!("Failed to create system: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let info = configured.get_system_info();
    println!(
        "{}: {} PHROM(s) on banks {}",
        info.name,
        info.device_count,
        info.banks
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",")
    );

    match (command, &args[2..]) {
        ("dump", [address, count]) => {
            let (Some(address), Some(count)) = (parse_number(address), parse_number(count)) else {
                eprintln!("Address and count must be decimal or 0x-prefixed hex");
                return ExitCode::FAILURE;
            };
            let width = configured.console_config().dump_width.max(1);
            let mut system = configured.into_system();
            let bytes = system.read_at(address, count as usize);

            for (row, chunk) in bytes.chunks(width).enumerate() {
                let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
                println!(
                    "{:05X}: {}",
                    address.wrapping_add((row * width) as u32),
                    hex.join(" ")
                );
            }
            if system.contention_events() > 0 {
                eprintln!("Warning: {} bus contention event(s)", system.contention_events());
            }
            ExitCode::SUCCESS
        }
        ("console", []) => {
            let console_config = configured.console_config();
            match run_console(configured.into_system(), console_config) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Console error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
    }
}
