use std::io::Write;

use anstyle::{AnsiColor, Color, Style};
use log::{Level, LevelFilter, log_enabled};

/// Installs the stderr logger, standard output is reserved for the generated tables.
///
/// `RUST_LOG` sets the base filter, `--verbose`/`--quiet` override it for all targets.
pub fn init(verbose: u8, quiet: bool) {
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .format_indent(Some(12))
        .filter(None, level_filter(verbose, quiet))
        .format(|f, record| {
            let style = f.default_level_style(record.level()).bold();

            match record.key_values().get("action".into()) {
                Some(action) => {
                    let style = style.fg_color(Some(Color::Ansi(AnsiColor::Green)));
                    write!(f, "{style}{:>12}{style:#} ", action.to_string())?;
                }
                None => write!(f, "{style}{:>12}{style:#} ", label(record.level()))?,
            }

            if log_enabled!(Level::Debug) {
                let dimmed = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack)));
                write!(f, "{dimmed}[{}]{dimmed:#} ", record.target())?;
            }

            writeln!(f, "{}", record.args())
        })
        .init();
}

fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }

    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        2.. => LevelFilter::Trace,
    }
}

/// Title-cased level names, matching the action labels.
fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "Error",
        Level::Warn => "Warning",
        Level::Info => "Info",
        Level::Debug => "Debug",
        Level::Trace => "Trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity() {
        assert_eq!(level_filter(0, false), LevelFilter::Info);
        assert_eq!(level_filter(1, false), LevelFilter::Debug);
        assert_eq!(level_filter(2, false), LevelFilter::Trace);
        assert_eq!(level_filter(7, false), LevelFilter::Trace);
    }

    #[test]
    fn quiet_wins() {
        assert_eq!(level_filter(0, true), LevelFilter::Warn);
        assert_eq!(level_filter(2, true), LevelFilter::Warn);
    }
}
