//! Terminal rendering for the intake console

use colored::Colorize;
use intake::{
    FieldKind, InboundCall, IntakeScript, NotificationOutcome, StepOutcome, StoredIntake,
    TeardownReport,
};

/// Output handler for terminal display
#[derive(Debug, Default)]
pub struct OutputHandler;

impl OutputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Print the call banner
    pub fn print_banner(&self, call: &InboundCall) {
        println!();
        println!(
            "{}",
            "╔═══════════════════════════════════════════════════════════════╗"
                .bright_cyan()
        );
        println!(
            "{}",
            "║                    INTAKE CALL                                ║"
                .bright_cyan()
        );
        println!(
            "{}",
            "╚═══════════════════════════════════════════════════════════════╝"
                .bright_cyan()
        );
        println!("  {} {}", "Call:".dimmed(), call.call_id.bright_white());
        println!("  {} {}", "From:".dimmed(), call.caller);
        println!("  {} {}", "To:  ".dimmed(), call.called);
        println!(
            "  {}",
            "Type your answers. /hangup or Ctrl-D ends the call.".dimmed()
        );
        println!();
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    pub fn print_success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text.bright_white());
    }

    pub fn print_error(&self, text: &str) {
        println!("{} {}", "✗".bright_red(), text.bright_red());
    }

    pub fn print_warning(&self, text: &str) {
        println!("{} {}", "⚠".bright_yellow(), text.yellow());
    }

    pub fn print_info(&self, text: &str) {
        println!("{} {}", "ℹ".bright_blue(), text);
    }

    /// Print what the agent says
    pub fn print_prompt(&self, text: &str) {
        for line in text.lines() {
            println!("{} {}", "agent>".bright_magenta(), line);
        }
    }

    fn print_step(&self, label: &str, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Completed => self.print_success(label),
            StepOutcome::AlreadyDone => self.print_success(&format!("{} (during the call)", label)),
            StepOutcome::Skipped(reason) => {
                self.print_info(&format!("{} skipped: {}", label, reason))
            }
            StepOutcome::Failed(reason) => {
                self.print_error(&format!("{} failed: {}", label, reason))
            }
        }
    }

    /// Print the teardown report
    pub fn print_report(&self, report: &TeardownReport) {
        self.print_header(&format!("Call {} ended", report.call_id));

        if report.record_finished {
            self.print_success("All fields collected");
        } else {
            self.print_warning("Caller hung up before the intake was complete");
        }
        self.print_step("Transport closed", &report.transport);
        self.print_step("Intake stored", &report.persistence);

        match &report.notification {
            NotificationOutcome::Sent(receipt) => self.print_success(&format!(
                "Confirmation sent ({}, {})",
                receipt.message_id, receipt.status
            )),
            NotificationOutcome::Skipped(reason) => {
                self.print_info(&format!("Confirmation skipped: {}", reason))
            }
            NotificationOutcome::Failed(reason) => {
                self.print_error(&format!("Confirmation failed: {}", reason))
            }
        }
    }

    pub fn print_stored(&self, stored: &StoredIntake) {
        self.print_header(&format!("Call {}", stored.call_id));
        println!("  {} {}", "Name:  ".dimmed(), stored.name.bright_white());
        println!("  {} {}", "Choice:".dimmed(), stored.choice_value.bright_white());
    }

    pub fn print_script(&self, script: &IntakeScript) {
        self.print_header("Intake script");

        for (i, field) in script.fields.iter().enumerate() {
            let mut tags = Vec::new();
            if field.name == script.contact_field {
                tags.push("contact");
            }
            if field.name == script.booking_field {
                tags.push("booking");
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", tags.join(", ")).dimmed().to_string()
            };

            match &field.kind {
                FieldKind::FreeText => {
                    println!("  {:>2}. {}{}", i + 1, field.name.bright_white(), tags);
                }
                FieldKind::Choice { noun, options } => {
                    println!(
                        "  {:>2}. {} {}{}",
                        i + 1,
                        field.name.bright_white(),
                        format!("(choose a {})", noun).dimmed(),
                        tags
                    );
                    for (n, option) in options.iter().enumerate() {
                        println!("        {}. {} at {}", n + 1, option.label, option.value);
                    }
                }
            }
        }
    }
}
