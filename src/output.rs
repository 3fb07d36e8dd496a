//! Operator-facing console messages.
//! Colored prefixes only when stdout is a TTY, so cron mail and redirected output stay plain.

use owo_colors::OwoColorize;

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

#[derive(Clone, Copy)]
enum Tone {
    Info,
    Warn,
    Error,
    Ok,
}

fn emit(tone: Tone, msg: &str) {
    let label = match tone {
        Tone::Info => "info:",
        Tone::Warn => "warn:",
        Tone::Error => "error:",
        Tone::Ok => "ok:",
    };
    let prefix = if is_tty() {
        match tone {
            Tone::Info => label.cyan().bold().to_string(),
            Tone::Warn => label.yellow().bold().to_string(),
            Tone::Error => label.red().bold().to_string(),
            Tone::Ok => label.green().bold().to_string(),
        }
    } else {
        label.to_string()
    };
    match tone {
        Tone::Info | Tone::Ok => println!("{prefix} {msg}"),
        Tone::Warn | Tone::Error => eprintln!("{prefix} {msg}"),
    }
}

pub fn print_info(msg: &str) {
    emit(Tone::Info, msg);
}

pub fn print_warn(msg: &str) {
    emit(Tone::Warn, msg);
}

pub fn print_error(msg: &str) {
    emit(Tone::Error, msg);
}

pub fn print_success(msg: &str) {
    emit(Tone::Ok, msg);
}

/// Plain line without prefix, for output that scripts may parse
/// (e.g. `source -> destination` lines of the run summary).
pub fn print_user(msg: &str) {
    println!("{msg}");
}
