use serde::Serialize;
use stratoconf::{Config, EnvSource, FileSource, MemorySource, Port};

#[derive(Serialize)]
struct Defaults {
    port: u16,
    host: String,
    debug: bool,
}

fn main() -> Result<(), stratoconf::ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Lowest layer: defaults from a plain struct.
    let defaults = MemorySource::from_value(
        "defaults",
        &Defaults {
            port: 8080,
            host: "localhost".into(),
            debug: false,
        },
    )?;

    // defaults -> optional file -> environment (APP_PORT, APP_DB__HOST, ...)
    let mut config = Config::lenient();
    config.add_source(defaults);
    config.add_source(FileSource::json("demos/app.json", false));
    config.add_source(EnvSource::with_prefix("APP_").separator("__"));

    let port: Port = config.resolve("port")?;
    let host: String = config.resolve("host")?;
    let debug: bool = config.resolve("debug")?;

    println!("listening on {host}:{port} (debug={debug})");

    for failure in config.load_failures() {
        eprintln!("skipped source: {failure}");
    }

    Ok(())
}
