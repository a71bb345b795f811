use env_logger::{Builder, Target};
use log::LevelFilter;

/// 初始化日誌；`RUST_LOG` 優先。 / Installs the stderr logger; `RUST_LOG` wins when set.
///
/// Without `RUST_LOG` everything logs at `Warn` and the photomatrix crates at
/// `Info`, raised one level per `-v`.
pub fn init(verbosity: u8) {
    if std::env::var("RUST_LOG").is_ok() {
        Builder::from_default_env().target(Target::Stderr).init();
        return;
    }
    Builder::new()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter_module("photomatrix", crate_level(verbosity))
        .init();
}

fn crate_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
