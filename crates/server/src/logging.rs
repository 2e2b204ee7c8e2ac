use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
    // 0 = service logs only (chromiumoxide protocol traffic is very noisy)
    // 1 (-v) = debug for the bridge, info for the CDP layer
    // 2+ (-vv) = trace everything
    let filter = match verbosity {
        0 => "info,chromiumoxide=warn",
        1 => "debug,chromiumoxide=info",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .init();
}
