use ::tracing::trace;
use clap::Parser;
use rusty_fork::rusty_fork_test;

use s3bulk::CLIArgs;
use s3bulk::Config;

mod cli;
mod tracing;

#[tokio::main]
async fn main() {
    let config = load_config_exit_if_err();

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    std::process::exit(cli::run(config).await);
}

fn load_config_exit_if_err() -> Config {
    let config = Config::try_from(CLIArgs::parse());
    if let Err(error_message) = config {
        let _ = clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).print();
        std::process::exit(cli::EXIT_CODE_INVALID_CONFIG);
    }

    config.unwrap()
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    if config.tracing_config.is_none() {
        return false;
    }

    tracing::init_tracing(config.tracing_config.as_ref().unwrap());
    true
}

rusty_fork_test! {
    #[test]
    fn with_tracing() {
        let args = vec![
            "unittest",
            "-i",
            "./manifest.txt",
            "--destination-bucket",
            "dest-bucket",
            "--destination-access-key",
            "key",
            "--destination-secret-key",
            "secret",
            "--destination-endpoint",
            "s3.example.local",
        ];

        let config = s3bulk::Config::try_from(CLIArgs::try_parse_from(args).unwrap()).unwrap();
        assert!(start_tracing_if_necessary(&config));
    }

    #[test]
    fn without_tracing() {
        let args = vec![
            "unittest",
            "-i",
            "./manifest.txt",
            "--destination-bucket",
            "dest-bucket",
            "--destination-access-key",
            "key",
            "--destination-secret-key",
            "secret",
            "--destination-endpoint",
            "s3.example.local",
            "-qqq",
        ];

        let config = s3bulk::Config::try_from(CLIArgs::try_parse_from(args).unwrap()).unwrap();
        assert!(!start_tracing_if_necessary(&config));
    }
}
