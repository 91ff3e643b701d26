use std::error::Error as StdError;

/// Format a postgres error with its full chain of causes
pub fn format_pg_error(e: &tokio_postgres::Error) -> String {
    let mut msg = e.to_string();

    // Prefer the server's error details
    if let Some(db_err) = e.as_db_error() {
        msg = db_err.to_string();
    } else if let Some(source) = e.source() {
        msg = format!("{}: {}", msg, source);
    }

    msg
}

/// Quote a string as a SQL literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> std::path::PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => std::path::PathBuf::from(path),
        },
        None => std::path::PathBuf::from(path),
    }
}
