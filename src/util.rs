use chrono::Local;

const SMTP_USER: &str = "SMTP_USER";

pub fn get_smtp_user() -> Option<String> {
    std::env::var(SMTP_USER).ok().filter(|user| !user.is_empty())
}

const SMTP_PASSWORD: &str = "SMTP_PASSWORD";

pub fn get_smtp_password() -> Option<String> {
    std::env::var(SMTP_PASSWORD).ok()
}

/// Local wall clock time as shown in front of every notification, e.g. `[14:05]`.
pub fn clock_prefix() -> String {
    format!("[{}]", Local::now().format("%H:%M"))
}

/// Joins a target base url and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
