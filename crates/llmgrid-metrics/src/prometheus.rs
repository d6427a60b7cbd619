//! Prometheus text exposition format.
//!
//! Renders workload records into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use llmgrid_state::{Phase, Workload};

/// One gauge family rendered per workload.
struct Gauge {
    name: &'static str,
    help: &'static str,
    value: fn(&Workload) -> String,
}

const GAUGES: &[Gauge] = &[
    Gauge {
        name: "llmgrid_requests_per_second",
        help: "Current requests per second.",
        value: |w| format!("{:.2}", w.metrics.rps),
    },
    Gauge {
        name: "llmgrid_latency_avg_ms",
        help: "Average request latency in milliseconds.",
        value: |w| w.metrics.avg_latency.as_millis().to_string(),
    },
    Gauge {
        name: "llmgrid_error_rate",
        help: "Error rate (0.0-1.0).",
        value: |w| format!("{:.4}", w.metrics.error_rate),
    },
    Gauge {
        name: "llmgrid_cpu_usage",
        help: "CPU utilization (0.0-1.0).",
        value: |w| format!("{:.4}", w.metrics.cpu_usage),
    },
    Gauge {
        name: "llmgrid_memory_usage",
        help: "Memory utilization (0.0-1.0).",
        value: |w| format!("{:.4}", w.metrics.memory_usage),
    },
    Gauge {
        name: "llmgrid_gpu_usage",
        help: "GPU utilization (0.0-1.0).",
        value: |w| format!("{:.4}", w.metrics.gpu_usage),
    },
    Gauge {
        name: "llmgrid_ready_replicas",
        help: "Number of ready replicas.",
        value: |w| w.status.ready_replicas.to_string(),
    },
];

/// Render workload metrics into Prometheus text format.
///
/// Per-workload gauges carry `workload` and `model` labels. A
/// `llmgrid_workloads` gauge counts records per phase.
pub fn render_prometheus(workloads: &[Workload]) -> String {
    let mut out = String::new();

    out.push_str("# HELP llmgrid_workloads Number of workloads by phase.\n");
    out.push_str("# TYPE llmgrid_workloads gauge\n");
    for phase in Phase::ALL {
        let count = workloads.iter().filter(|w| w.phase() == phase).count();
        let _ = writeln!(out, "llmgrid_workloads{{phase=\"{phase}\"}} {count}");
    }

    for gauge in GAUGES {
        let _ = writeln!(out, "# HELP {} {}", gauge.name, gauge.help);
        let _ = writeln!(out, "# TYPE {} gauge", gauge.name);
        for w in workloads {
            let _ = writeln!(
                out,
                "{}{{workload=\"{}\",model=\"{}\"}} {}",
                gauge.name,
                escape_label(&w.id),
                escape_label(&w.model_name),
                (gauge.value)(w)
            );
        }
    }

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
