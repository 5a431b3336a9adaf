use colored::Colorize;

use crate::engine::models::{OperationStatus, ProgressEvent, ResourceState};
use crate::store::Parameter;

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print the outcome of a lifecycle event.
pub fn print_event(operation: &str, event: &ProgressEvent) {
    println!();
    let status = match event.status {
        OperationStatus::Success => event.status.to_string().green().bold(),
        OperationStatus::Failed => event.status.to_string().red().bold(),
    };
    println!("{} {}", operation.bold().cyan(), status);
    println!("{}", "─".repeat(60));

    if let Some(ref message) = event.message {
        println!("  {:<18} {}", "Message:".bold(), message);
    }
    if let Some(ref model) = event.resource_model {
        print_resource_fields(model);
    }
    for model in &event.resource_models {
        print_resource_fields(model);
    }

    println!("{}", "─".repeat(60));
    println!();
}

fn print_resource_fields(model: &ResourceState) {
    let field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            println!("  {:<18} {}", label.bold(), value);
        }
    };

    field("Provisioning ID:", model.provisioning_id.clone());
    field(
        "Instance Type:",
        model.instance_type.as_ref().map(|t| t.green().bold().to_string()),
    );
    field("Current Type:", model.current_type.clone());
    field("Recommended Type:", model.recommended_type.clone());
    field("Predicted Uptime:", model.predicted_uptime.map(format_metric));
    field("Savings Estimate:", model.savings_estimate.map(format_metric));
    field("Test Account:", model.test_account_override.clone());
}

/// Unknown metrics are reported as -1 and shown as such.
fn format_metric(value: f64) -> String {
    if value < 0.0 {
        "(unknown)".dimmed().to_string()
    } else {
        format!("{}", value)
    }
}

/// Print parameters from the store. Secure values are masked.
pub fn print_parameter_list(parameters: &[Parameter]) {
    if parameters.is_empty() {
        println!("{}", "No parameters in store.".dimmed());
        return;
    }

    println!();
    println!("{}", "Parameters".bold().cyan());
    println!("{}", "─".repeat(80));
    println!(
        "  {:<45} {:<8} {:<8} {}",
        "NAME".bold(),
        "TYPE".bold(),
        "VERSION".bold(),
        "UPDATED".bold()
    );
    println!("{}", "─".repeat(80));

    for parameter in parameters {
        let kind = if parameter.secure {
            "secure".yellow().to_string()
        } else {
            "plain".to_string()
        };
        println!(
            "  {:<45} {:<8} {:<8} {}",
            parameter.name,
            kind,
            parameter.version,
            parameter.updated_at.dimmed()
        );
    }

    println!();
    println!("  {} parameter(s) total.", parameters.len());
    println!();
}

/// Print one parameter with its value.
pub fn print_parameter_detail(parameter: &Parameter) {
    println!();
    println!("{} {}", "Parameter:".bold().cyan(), parameter.name.bold());
    println!("{}", "─".repeat(60));
    println!("  {:<18} {}", "Version:".bold(), parameter.version);
    println!("  {:<18} {}", "Updated:".bold(), parameter.updated_at);

    let value = if parameter.secure {
        "(sensitive)".dimmed().to_string()
    } else {
        match serde_json::from_str::<serde_json::Value>(&parameter.value) {
            Ok(json) if json.is_object() => {
                serde_json::to_string_pretty(&json).unwrap_or_else(|_| parameter.value.clone())
            }
            _ => parameter.value.clone(),
        }
    };
    println!("  {}:", "Value".bold());
    for line in value.lines() {
        println!("    {}", line);
    }

    println!("{}", "─".repeat(60));
    println!();
}
