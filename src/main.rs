use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use impactmon::commands;

fn category_arg() -> Arg {
    Arg::new("category")
        .short('c')
        .long("category")
        .value_name("CATEGORY")
        .help("Ranking category: cpu, memory, disk, disk-read, disk-write, network, gpu, battery, overall")
}

fn top_arg() -> Arg {
    Arg::new("top")
        .short('n')
        .long("top")
        .value_name("N")
        .help("Number of processes to show")
        .value_parser(clap::value_parser!(usize))
        .default_value("15")
}

fn interval_arg() -> Arg {
    Arg::new("interval")
        .short('i')
        .long("interval")
        .value_name("MS")
        .help("Sampling interval in milliseconds (overrides the config file)")
        .value_parser(clap::value_parser!(u64))
}

fn include_system_arg() -> Arg {
    Arg::new("include-system")
        .short('s')
        .long("include-system")
        .help("Track and show operating system processes")
        .action(ArgAction::SetTrue)
}

fn main() -> Result<()> {
    impactmon::init_logging();

    let matches = Command::new("impactmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Real-time per-process resource impact monitor")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("watch")
                .about("Show a live impact ranking until Ctrl+C")
                .arg(interval_arg())
                .arg(top_arg())
                .arg(category_arg())
                .arg(include_system_arg()),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Sample for a while and print the ranking once")
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_name("SECS")
                        .help("How long to sample")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the result as JSON")
                        .action(ArgAction::SetTrue),
                )
                .arg(interval_arg())
                .arg(top_arg())
                .arg(category_arg())
                .arg(include_system_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Show the active configuration")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .help("Only print the config file location")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("init")
                        .long("init")
                        .help("Write a default config file if none exists")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("path"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches)?,
        Some(("snapshot", sub_matches)) => commands::snapshot(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        _ => {
            println!("Use 'impactmon --help' for more information.");
        }
    }

    Ok(())
}
