use std::path::PathBuf;

use anyhow::Context;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;

/// Map the `-v`/`-w` flags onto a log threshold. Invariant warnings are
/// logged at INFO and below so they only surface in the verbose modes.
pub fn level_filter(verbose: bool, very_verbose: bool) -> LevelFilter {
    if very_verbose {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

pub fn init_logging(
    level: LevelFilter,
    log_filepath: Option<&PathBuf>,
) -> anyhow::Result<Handle> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{h({l})} [{d(%H:%M:%S)}] {m}{n}",
        )))
        .build();
    let mut config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(console)));
    let mut root = Root::builder().appender("stderr");
    if let Some(fp) = log_filepath {
        crate::util::create_out_directory(fp)?;
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "[{d(%Y-%m-%d %H:%M:%S)} {l}] {m}{n}",
            )))
            .append(false)
            .build(fp)
            .with_context(|| format!("failed to open log file {fp:?}"))?;
        config = config
            .appender(Appender::builder().build("logfile", Box::new(file)));
        root = root.appender("logfile");
    }
    let config = config.build(root.build(level))?;
    log4rs::init_config(config).context("failed to install logger")
}
