//! GitHub Actions Workflow Rendering
//!
//! Emits the YAML the hosting platform consumes for a [`Workflow`]. Output is
//! deterministic: jobs in declaration order, `with` inputs and `env` in key
//! order, two-space indentation and a blank line between top-level sections
//! and between jobs. Matrix jobs use a single `os` axis.

use benchgate_pipeline::{JobDef, RunsOn, StepAction, StepDef, Workflow};
use std::fmt::Write;

/// Render `workflow` as a GitHub Actions workflow file.
pub fn render_github_workflow(workflow: &Workflow) -> String {
    let mut out = String::new();
    line(&mut out, 0, &format!("name: {}", scalar(&workflow.name)));

    out.push('\n');
    line(&mut out, 0, "on:");
    if !workflow.triggers.push.is_empty() {
        line(&mut out, 1, "push:");
        line(
            &mut out,
            2,
            &format!("branches: {}", flow_sequence(&workflow.triggers.push)),
        );
    }
    if workflow.triggers.pull_request {
        line(&mut out, 1, "pull_request:");
    }

    if !workflow.env.is_empty() {
        out.push('\n');
        line(&mut out, 0, "env:");
        for (key, value) in &workflow.env {
            line(&mut out, 1, &format!("{key}: {}", scalar(value)));
        }
    }

    out.push('\n');
    line(&mut out, 0, "jobs:");
    for (i, job) in workflow.jobs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_job(&mut out, job);
    }
    out
}

fn render_job(out: &mut String, job: &JobDef) {
    line(out, 1, &format!("{}:", job.id));
    line(out, 2, &format!("name: {}", scalar(&job.name)));
    match job.needs.as_slice() {
        [] => {}
        [one] => line(out, 2, &format!("needs: {one}")),
        many => line(out, 2, &format!("needs: {}", flow_sequence(many))),
    }
    match &job.runs_on {
        RunsOn::Fixed(platform) => line(out, 2, &format!("runs-on: {}", scalar(platform.as_str()))),
        RunsOn::Matrix { .. } => line(out, 2, "runs-on: ${{ matrix.os }}"),
    }
    if let Some(minutes) = job.timeout_minutes {
        line(out, 2, &format!("timeout-minutes: {minutes}"));
    }
    if let RunsOn::Matrix { matrix } = &job.runs_on {
        line(out, 2, "strategy:");
        if !job.fail_fast {
            line(out, 3, "fail-fast: false");
        }
        line(out, 3, "matrix:");
        let platforms: Vec<&str> = matrix.iter().map(|p| p.as_str()).collect();
        line(out, 4, &format!("os: {}", flow_sequence(&platforms)));
    }
    line(out, 2, "steps:");
    for step in &job.steps {
        render_step(out, step);
    }
}

fn render_step(out: &mut String, step: &StepDef) {
    line(out, 3, &format!("- name: {}", scalar(&step.name)));
    match &step.action {
        StepAction::Uses { action, with } => {
            line(out, 4, &format!("uses: {}", scalar(&action.to_string())));
            if !with.is_empty() {
                line(out, 4, "with:");
                for (key, value) in with {
                    key_value(out, 5, key, value);
                }
            }
        }
        StepAction::Run { command, .. } => key_value(out, 4, "run", command),
    }
    if step.continue_on_error {
        line(out, 4, "continue-on-error: true");
    }
}

/// `key: value`, switching to a literal block for multi-line values.
fn key_value(out: &mut String, depth: usize, key: &str, value: &str) {
    if value.contains('\n') {
        line(out, depth, &format!("{key}: |"));
        for text in value.lines() {
            line(out, depth + 1, text);
        }
    } else {
        line(out, depth, &format!("{key}: {}", scalar(value)));
    }
}

fn line(out: &mut String, depth: usize, text: &str) {
    let _ = writeln!(out, "{:width$}{text}", "", width = depth * 2);
}

fn flow_sequence<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<String> = items.iter().map(|s| flow_scalar(s.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

fn flow_scalar(s: &str) -> String {
    if s.contains([',', '[', ']', '{', '}']) {
        quoted(s)
    } else {
        scalar(s)
    }
}

/// A block-context scalar, quoted only when a plain scalar would change
/// meaning.
fn scalar(s: &str) -> String {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ];
    const RESERVED: &[&str] = &[
        "true", "false", "yes", "no", "on", "off", "null", "~", "y", "n",
    ];

    // A dash followed by a non-space (`--check`) is still a plain scalar.
    let dash_word = s.len() > 1 && s.starts_with('-') && !s[1..].starts_with(' ');
    let needs_quotes = s.is_empty()
        || (s.starts_with(INDICATORS) && !dash_word)
        || s.starts_with(char::is_whitespace)
        || s.ends_with(char::is_whitespace)
        || s.contains(": ")
        || s.contains(" #")
        || s.ends_with(':')
        || RESERVED.contains(&s.to_ascii_lowercase().as_str())
        || s.parse::<f64>().is_ok();
    if needs_quotes {
        quoted(s)
    } else {
        s.to_string()
    }
}

fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
