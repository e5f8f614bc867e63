//! Terminal output
//!
//! Data (JSON, trees, TOML) goes to stdout uncolored so it can be piped.
//! Diagnostics go to stderr. `colored` honours NO_COLOR and CLICOLOR_FORCE.

use std::fmt::Display;

use colored::Colorize;

use crate::domain::Unit;

pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "warning".yellow(), msg);
}

pub fn success(msg: &(impl Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// `label: value` with a green label.
pub fn labelled(label: &str, value: &(impl Display + ?Sized)) {
    println!("{}: {}", label.green(), value);
}

pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// One row of a unit table; the default unit is starred.
pub fn unit_row(unit: &Unit, is_default: bool) {
    let marker = if is_default { "*".yellow().to_string() } else { " ".to_string() };
    println!(
        "{} {:<14} {:<12} x{}",
        marker,
        unit.id,
        unit.abbreviations.join(", ").dimmed(),
        unit.factor
    );
}

/// Raw data on stdout.
pub fn data(payload: &(impl Display + ?Sized)) {
    println!("{}", payload);
}
