use crate::config::LogSettings;
use flexi_logger::{
    style, Age, Cleanup, Criterion, DeferredNow, Duplicate, FileSpec, Logger,
    Naming, WriteMode,
};
use log::{debug, Record};

/**
 * Starts logging for one binding session. Records go to files named after the
 * session's project, under the configured directory, and warnings (or all
 * records, when 'verbose') are copied to stdout.
 */
pub fn configure(
    level: &str,
    verbose: bool,
    project: &str,
    settings: &LogSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let basename = log_basename(project);
    let dup = if verbose {
        Duplicate::All
    } else {
        Duplicate::Warn
    };
    let criterion = if settings.rotate_daily {
        Criterion::Age(Age::Day)
    } else {
        Criterion::Size(settings.max_bytes)
    };

    Logger::try_with_str(level)?
        .log_to_file(
            FileSpec::default()
                .directory(&settings.directory)
                .basename(basename.as_str()),
        )
        .duplicate_to_stdout(dup)
        .write_mode(WriteMode::BufferAndFlush)
        .format(session_format)
        .rotate(
            criterion,
            Naming::Timestamps,
            Cleanup::KeepLogFiles(settings.keep_files),
        )
        .start()?;
    debug!(
        "session log: {}/{}_*.log (level: {})",
        settings.directory, basename, level
    );
    Ok(())
}

/// Project names may contain anything, log-file names may not.
pub fn log_basename(project: &str) -> String {
    let name: String = project
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if name.is_empty() {
        "hls-bind".to_string()
    } else {
        name
    }
}

fn session_format(
    out: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    rec: &Record,
) -> Result<(), std::io::Error> {
    let level = rec.level();
    let tag = format!("{:<5}", level);
    write!(
        out,
        "{} {} [{}] {}",
        now.format("%H:%M:%S%.3f"),
        style(level).paint(tag),
        rec.module_path().unwrap_or("hls_bind"),
        rec.args()
    )
}
