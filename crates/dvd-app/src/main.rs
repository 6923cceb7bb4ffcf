use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dvd_app::{DemoConfig, Engine, EngineError};
use dvd_framework::logging::{init_logging, LoggingConfig};

#[derive(Debug, Parser)]
#[command(name = "dvd", version, about = "Bouncing logo that counts wall and corner hits")]
struct Args {
    /// Enable GPU validation and debug-level logging.
    #[arg(long, short)]
    debug: bool,
    /// TOML file overriding the built-in defaults.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), EngineError> {
    let config = match &args.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };

    let mut engine = Engine::new(config);
    engine.init_window(args.debug)?;
    engine.init_shaders()?;
    engine.init_shapes()?;

    while !engine.should_close() {
        engine.process_input();
        engine.update();
        engine.render();
    }

    log::info!(
        "bye: {} wall hit(s), {} corner hit(s)",
        engine.walls_hit(),
        engine.corners_hit()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(LoggingConfig::with_debug(args.debug));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("dvd").chain(args.iter().copied()))
    }

    #[test]
    fn no_args_is_release_defaults() {
        let args = parse(&[]).unwrap();
        assert!(!args.debug);
        assert_eq!(args.config, None);
    }

    #[test]
    fn debug_and_config() {
        let args = parse(&["--debug", "--config", "demo.toml"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.config, Some(PathBuf::from("demo.toml")));

        let args = parse(&["--config=other.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("other.toml")));

        let args = parse(&["-d", "-c", "short.toml"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.config, Some(PathBuf::from("short.toml")));
    }

    #[test]
    fn config_without_path_is_an_error() {
        assert!(parse(&["--config"]).is_err());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let err = parse(&["--fullscreen"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(err.use_stderr());
    }

    #[test]
    fn help_is_not_a_usage_error() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }
}
