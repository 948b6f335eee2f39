use crate::services::results_types::{ResultsDocument, RunStatus};
use crate::services::trace_query::{
    DeviceSummary, LossStatistics, device_summaries, rank_by_lifetime,
};

pub fn format_lifetime_report(document: &ResultsDocument) -> String {
    let summaries = device_summaries(document);

    let mut lines = Vec::new();
    lines.push("Lifetime Report".to_string());
    lines.push(format!("Mission: {}", document.mission));
    lines.push(format!("Ambient temperature: {:.1} °C", document.ambient_temperature));
    lines.push(format!("Mission duration: {:.3} s", document.mission_duration));
    lines.push(String::new());
    lines.push("Device | Years to failure | Damage per mission | Peak Tj (°C) | Avg loss (W) | Cycles".to_string());
    lines.push("-------|------------------|--------------------|--------------|--------------|-------".to_string());
    for summary in rank_by_lifetime(&summaries) {
        lines.push(format_summary_row(summary));
    }

    let with_losses: Vec<&DeviceSummary> = summaries
        .iter()
        .filter(|summary| summary.peak_power.is_some())
        .collect();
    if !with_losses.is_empty() {
        lines.push(String::new());
        lines.push("Loss breakdown, peak / average (W):".to_string());
        for summary in with_losses {
            lines.push(format_loss_row(summary));
        }
    }

    let failures: Vec<String> = document
        .devices
        .iter()
        .filter_map(|device| match &device.status {
            RunStatus::Failed { kind, message, .. } => {
                Some(format!("{}: {kind}: {message}", device.name))
            }
            RunStatus::Completed => None,
        })
        .collect();
    if !failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed runs:".to_string());
        lines.extend(failures);
    }

    let excursions: Vec<&DeviceSummary> = summaries
        .iter()
        .filter(|summary| summary.exceeded_max_temperature)
        .collect();
    if !excursions.is_empty() {
        lines.push(String::new());
        for summary in excursions {
            lines.push(format!(
                "Warning: {} exceeded its maximum junction temperature",
                summary.name
            ));
        }
    }

    lines.join("\n")
}

fn format_summary_row(summary: &DeviceSummary) -> String {
    let years = match (summary.completed, summary.years_to_failure) {
        (false, _) => "failed".to_string(),
        (true, Some(years)) => format!("{years:.3e}"),
        (true, None) => "no appreciable damage".to_string(),
    };
    format!(
        "{name} | {years} | {damage} | {peak} | {power} | {full} full, {half} half",
        name = summary.name,
        damage = optional(summary.damage_fraction, |v| format!("{v:.3e}")),
        peak = optional(summary.peak_junction_temperature, |v| format!("{v:.2}")),
        power = optional(summary.average_power, |v| format!("{v:.3}")),
        full = summary.full_cycles,
        half = summary.half_cycles,
    )
}

fn format_loss_row(summary: &DeviceSummary) -> String {
    let losses = &summary.losses;
    format!(
        "{name}: conduction {conduction}, switching {switching}, capacitive {capacitive}, reverse recovery {recovery}",
        name = summary.name,
        conduction = format_loss(&losses.conduction),
        switching = format_loss(&losses.switching),
        capacitive = format_loss(&losses.capacitive),
        recovery = format_loss(&losses.reverse_recovery),
    )
}

fn format_loss(statistics: &LossStatistics) -> String {
    format!(
        "{} / {}",
        optional(statistics.peak, |v| format!("{v:.3}")),
        optional(statistics.average, |v| format!("{v:.3}"))
    )
}

fn optional(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "n/a".to_string())
}
