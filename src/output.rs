use colored::Colorize;

/// Plain progress line on stdout.
pub fn line(msg: &str) {
    println!("{msg}");
}

/// Final-state confirmation, wp-cli style.
pub fn success(msg: &str) {
    println!("{} {msg}", "Success:".green().bold());
}

/// Recoverable condition. Goes to stderr so stdout stays parseable.
pub fn warning(msg: &str) {
    eprintln!("{} {msg}", "Warning:".yellow().bold());
}

/// Fatal condition, printed right before a non-zero exit.
pub fn error(msg: &str) {
    eprintln!("{} {msg}", "Error:".red().bold());
}
