use std::path::Path;

use rn_domain::config::{ConfigFile, ConfigSeverity};

/// Validate a parsed config file, printing any issues.
///
/// Returns `true` when there are no errors (warnings are allowed).
pub fn validate(file: &ConfigFile, config_path: &Path, known_plugins: &[&str]) -> bool {
    let issues = file.validate(known_plugins);

    if issues.is_empty() {
        println!("Config OK ({})", config_path.display());
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {}",
        error_count,
        warning_count,
        config_path.display(),
    );

    error_count == 0
}
