use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::path::Path;
use std::time::SystemTime;

pub fn setup_logger(log_path: &str, level: LevelFilter) -> Result<(), fern::InitError> {
    if let Some(dir) = Path::new(log_path).parent() {
        std::fs::create_dir_all(dir)?;
    }

    let colors = ColoredLevelConfig::new()
        .info(Color::Magenta)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("actix_server", LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_path)?)
        .apply()?;
    Ok(())
}
