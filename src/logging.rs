use tracing_subscriber::EnvFilter;

/// ログ出力を初期化（stderr。stdoutはJSON出力用に空けておく）
///
/// RUST_LOG があればそれを優先。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
