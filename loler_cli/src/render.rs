use std::fmt::Write;

use loler_core::{
    device_auth::DeviceAuthState,
    memory_lol::{not_found, SearchReport},
};

pub const APPROVAL_URL: &str = "https://api.memory.lol/v1/login/github";

pub fn render_report(report: &SearchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Results for {} on {}{}",
        report.query,
        report.platform,
        if report.authenticated { " (authenticated)" } else { "" }
    );

    for result in &report.results {
        let _ = writeln!(
            out,
            "\n@{} ({} screen names)",
            result.username,
            result.screen_name_count()
        );
        if result.accounts.is_empty() {
            let _ = writeln!(out, "  no accounts found");
        }
        for account in &result.accounts {
            let _ = writeln!(out, "  account {}", account.id_str);
            for entry in &account.screen_names {
                let _ = writeln!(out, "    {:<20} {}", entry.name, entry.span());
            }
        }
    }

    let missing = not_found(&report.query, &report.results);
    if !missing.is_empty() {
        let _ = writeln!(out, "\nNot found: {}", missing.join(", "));
        let _ = writeln!(out, "{}", not_found_hint(report.authenticated));
    }

    out
}

pub fn not_found_hint(authenticated: bool) -> String {
    if authenticated {
        format!(
            "Your token may not be approved for full access yet. Request approval at {}",
            APPROVAL_URL
        )
    } else {
        "Without authentication Memory.lol only returns the last 60 days. Run with --login for full history."
            .to_string()
    }
}

/// Turns the login state stream into the few lines worth printing.
#[derive(Debug, Default)]
pub struct LoginProgress {
    shown_code: Option<String>,
    last_reported: Option<u64>,
}

impl LoginProgress {
    pub fn line(&mut self, state: &DeviceAuthState) -> Option<String> {
        match state {
            DeviceAuthState::CodeRequested => {
                Some("Requesting a device code from GitHub...".to_string())
            }
            DeviceAuthState::AwaitingUserAction(pending) | DeviceAuthState::Verifying(pending) => {
                let session = &pending.session;
                let remaining = pending.remaining_secs;

                if self.shown_code.as_deref() != Some(session.user_code.as_str()) {
                    self.shown_code = Some(session.user_code.clone());
                    self.last_reported = Some(remaining);
                    return Some(format!(
                        "Open {} and enter the code {}\nWaiting for authorization ({}s left, Ctrl-C to cancel)",
                        session.verification_uri, session.user_code, remaining
                    ));
                }

                // Countdown every 30 seconds.
                if remaining % 30 == 0 && self.last_reported != Some(remaining) {
                    self.last_reported = Some(remaining);
                    return Some(format!("Still waiting ({}s left)", remaining));
                }

                None
            }
            DeviceAuthState::Authenticated(_) => Some("Authenticated. Token saved.".to_string()),
            DeviceAuthState::Failed(reason) => Some(reason.clone()),
            DeviceAuthState::Expired => {
                Some("The device code expired. Run --login again.".to_string())
            }
            DeviceAuthState::Idle => None,
        }
    }
}
