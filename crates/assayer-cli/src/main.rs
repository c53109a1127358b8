use anyhow::Result;
use assayer_cli::input::Input;
use assayer_cli::Runner;
use clap::{Arg, Command, ValueHint};
#[cfg(not(target_os = "windows"))]
use rlimit::{setrlimit, Resource};

fn increase_limits() -> Result<(), anyhow::Error> {
    #[cfg(not(target_os = "windows"))]
    {
        // A batch can hold many raw exports open at once (Unix only)
        setrlimit(Resource::NOFILE, 65536, 65536)?;
    }
    #[cfg(target_os = "windows")]
    {
        log::warn!("File descriptor limits not adjustable on Windows.");
    }
    Ok(())
}

fn main() -> Result<()> {
    increase_limits()?;

    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("ASSAYER_LOG", "error,assayer=info"))
        .init();

    let matches = Command::new("assayer")
        .version(clap::crate_version!())
        .about("\u{2697} Assayer - analytical decisions for an autonomous chemistry workstation")
        .arg(
            Arg::new("settings")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to the settings table (TOML file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("batch")
                .short('b')
                .long("batch")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Sample batch file. Overrides the batch listed in the settings table.")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(clap::value_parser!(u16).range(1..))
                .help("Number of threads for parallel processing (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(&matches)?;

    let mut runner = Runner::new(input)?;
    runner.run()?;

    Ok(())
}
