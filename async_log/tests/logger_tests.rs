use std::fs;

use async_log::{Level, Logger, MAX_LINES, time};

#[test]
fn test_civil_date_conversion() {
    let dt = time::from_unix(0, 0);
    assert_eq!((dt.year, dt.month, dt.day), (1970, 1, 1));
    assert_eq!((dt.hour, dt.minute, dt.second, dt.micros), (0, 0, 0, 0));

    // 2000-02-29 00:00:00 UTC, a leap day on a century year.
    let dt = time::from_unix(951_782_400, 250);
    assert_eq!((dt.year, dt.month, dt.day), (2000, 2, 29));
    assert_eq!(dt.micros, 250);

    // 2024-02-29 12:34:56 UTC.
    let dt = time::from_unix(1_709_210_096, 0);
    assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
    assert_eq!((dt.hour, dt.minute, dt.second), (12, 34, 56));
}

// The logger handle is process-wide, so everything that touches it lives
// in one test.
#[test]
fn test_lines_levels_and_size_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap().to_string();

    // Queue capacity 0: synchronous writes, deterministic file contents.
    Logger::init(Level::Info, &path, ".log", 0);
    let logger = Logger::global().expect("logger installed");

    async_log::info!("hello {}", 42);
    async_log::warn!("watch out");
    async_log::debug!("below the threshold");
    logger.flush();

    let entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let content = fs::read_to_string(&entries[0]).unwrap();
    assert!(content.contains("[info] : hello 42"));
    assert!(content.contains("[warn] : watch out"));
    assert!(!content.contains("below the threshold"));
    // Every line opens with a full timestamp.
    for line in content.lines() {
        assert_eq!(line.as_bytes()[4], b'-');
        assert_eq!(line.as_bytes()[10], b' ');
        assert_eq!(line.as_bytes()[19], b'.');
    }

    assert!(logger.enabled(Level::Error));
    logger.set_level(Level::Error);
    assert!(!logger.enabled(Level::Warn));
    logger.set_level(Level::Info);

    // Push the line counter over the rollover threshold.
    for i in 0..MAX_LINES {
        async_log::info!("fill {}", i);
    }
    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|n| n.contains("-1.log")));

    logger.close();
    logger.close();
}
