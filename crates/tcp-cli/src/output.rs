use tcp_domain::{ActionKind, Plan, PlanAction};

fn action_glyph(action: &PlanAction) -> &'static str {
    match action.action {
        ActionKind::Create => "+",
        ActionKind::Update => "~",
        ActionKind::Delete => "-",
        ActionKind::NoOp => " ",
    }
}

/// Render a plan's ordered actions as a human-readable table.
pub fn render_plan_text(plan: &Plan) -> String {
    if plan.actions.is_empty() {
        return "No changes.".to_string();
    }
    let mut out = String::new();
    out.push_str(&format!("Plan {} ({:?}, {:?})\n", plan.id, plan.status, plan.tier));
    for action in &plan.actions {
        out.push_str(&format!(
            "{} {} ({}) via {}\n",
            action_glyph(action),
            action.resource_name,
            action.resource_type,
            action.provider,
        ));
        for field in &action.diff {
            out.push_str(&format!("    {} {:?} -> {:?}\n", field.field, field.before, field.after));
        }
        if !action.depends_on.is_empty() {
            out.push_str(&format!("    depends on: {}\n", action.depends_on.join(", ")));
        }
    }
    if !plan.fidelity_reports.is_empty() {
        out.push_str("\nFidelity:\n");
        for report in &plan.fidelity_reports {
            out.push_str(&format!("  {} -> {:?} ({} gap(s))\n", report.capability, report.level, report.gaps.len()));
        }
    }
    out
}

/// Render a plan's dependency graph as Graphviz DOT.
pub fn render_plan_dot(plan: &Plan) -> String {
    let mut out = String::from("digraph plan {\n  rankdir=LR;\n  node [shape=box];\n\n");
    for action in &plan.actions {
        out.push_str(&format!(
            "  \"{}\" [label=\"{}\\n{:?}\"];\n",
            action.resource_name, action.resource_name, action.action
        ));
    }
    for action in &plan.actions {
        for dep in &action.depends_on {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", dep, action.resource_name));
        }
    }
    out.push('}');
    out
}
