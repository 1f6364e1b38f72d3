use slog::Drain;

/// Build the logger for a command run.
///
/// Records go to stderr. Only warnings and errors are shown unless `debug`
/// is set.
pub fn new_logger(debug: bool) -> slog::Logger {
    let level = if debug { slog::Level::Debug } else { slog::Level::Warning };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();

    slog::Logger::root(drain, slog::o!())
}

#[cfg(test)]
pub fn discard() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
