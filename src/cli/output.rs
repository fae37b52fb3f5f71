//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use chrono::DateTime;

use crate::auth::{decode_claims, AuthStatus, Claims, Decision, Session};
use crate::routes::Screen;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Format an auth status as a colored string
pub fn format_status(status: AuthStatus) -> String {
    let text = status.to_string();
    match status {
        AuthStatus::Succeeded => text.green().to_string(),
        AuthStatus::Failed => text.red().to_string(),
        AuthStatus::Loading => text.yellow().to_string(),
        AuthStatus::Idle => text,
    }
}

/// Short label for a guard decision
pub fn format_decision(decision: Decision) -> String {
    match decision {
        Decision::Allow => "allow".green().to_string(),
        Decision::Pending => "pending".yellow().to_string(),
        Decision::RedirectLogin => format!("{} {}", "→".red(), "/login"),
        Decision::RedirectUnauthorized => format!("{} {}", "→".red(), "/unauthorized"),
    }
}

/// Print the session as a detail block
pub fn print_session_detail(session: &Session) {
    println!("{}", "Session".bold().underline());
    println!();

    let Some(user) = session.user.as_ref().filter(|_| session.is_authenticated) else {
        println!("  {} {}", "Status:".bold(), format_status(session.status));
        if let Some(err) = &session.error {
            println!("  {} {}", "Error:".bold(), err.red());
        }
        println!("  {}", "Not logged in".dimmed());
        return;
    };

    println!("  {} {}", "User ID:".bold(), user.id);
    if let Some(name) = user.name() {
        println!("  {} {}", "Name:".bold(), name);
    }
    if let Some(email) = user.email() {
        println!("  {} {}", "Email:".bold(), email);
    }
    println!("  {} {}", "Role:".bold(), user.role.to_string().cyan());
    println!("  {} {}", "Status:".bold(), format_status(session.status));

    match session.token.as_deref().map(decode_claims) {
        Some(Ok(claims)) => {
            println!();
            println!("{}", "Token".bold().underline());
            println!();
            for (label, value) in claim_lines(&claims) {
                println!("  {} {}", format!("{}:", label).bold(), value);
            }
        }
        Some(Err(e)) => println!("  {} {}", "Token:".bold(), e.to_string().red()),
        None => {}
    }
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Labelled token claims, in display order
pub fn claim_lines(claims: &Claims) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    if let Some(sub) = &claims.sub {
        let subject = match sub {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(("Subject", subject));
    }
    if let Some(role) = &claims.role {
        lines.push(("Role claim", role.clone()));
    }
    if let Some(iat) = claims.iat {
        lines.push(("Issued", format_timestamp(iat)));
    }
    lines.push(("Expires", format_timestamp(claims.exp)));
    lines
}

/// Print screens with the decision for the current session
pub fn print_route_table(rows: &[(Screen, Decision)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Screen").fg(Color::Cyan),
            Cell::new("Roles").fg(Color::Cyan),
            Cell::new("Access").fg(Color::Cyan),
        ]);

    for (screen, decision) in rows {
        let roles = if screen.public {
            "public".to_string()
        } else if screen.roles.is_empty() {
            "any".to_string()
        } else {
            screen.roles.join(", ")
        };

        let (label, color) = match decision {
            Decision::Allow => ("allow".to_string(), Color::Green),
            Decision::Pending => ("pending".to_string(), Color::Yellow),
            other => (
                format!("redirect {}", other.redirect_target().unwrap_or("-")),
                Color::Red,
            ),
        };

        table.add_row(vec![
            Cell::new(&screen.path),
            Cell::new(roles),
            Cell::new(label).fg(color),
        ]);
    }

    println!("{table}");
}
