// src/inspect.rs

//! `inspect` command output.

use std::collections::HashMap;
use std::fmt::Write;

use petgraph::dot::Dot;

use crate::graph::{BuildGraph, NodeId};
use crate::plan::BuildPlan;

/// Human-readable dump of the graph annotated with the plan's reasons.
pub fn render_text(graph: &BuildGraph, plan: &BuildPlan) -> String {
    let stale_objects: HashMap<NodeId, String> = plan
        .stale_objects
        .iter()
        .map(|(id, reason)| (*id, reason.to_string()))
        .collect();
    let stale_targets: HashMap<NodeId, String> = plan
        .stale_targets
        .iter()
        .map(|(id, reason)| (*id, reason.to_string()))
        .collect();

    let status = |map: &HashMap<NodeId, String>, id: NodeId| match map.get(&id) {
        Some(reason) => format!("stale: {reason}"),
        None => "fresh".to_string(),
    };

    let mut out = String::new();

    let _ = writeln!(out, "include paths:");
    for p in graph.include_paths() {
        let _ = writeln!(out, "  {}", p.display());
    }
    let _ = writeln!(out, "library paths:");
    for p in graph.library_paths() {
        let _ = writeln!(out, "  {}", p.display());
    }

    let common = graph.common_pool();
    let _ = writeln!(out, "common pool ({} objects):", common.len());
    for id in common {
        let obj = graph.object(id);
        let _ = writeln!(
            out,
            "  {} -> {} [{}]",
            obj.source.display(),
            obj.path.display(),
            status(&stale_objects, id)
        );
    }

    let _ = writeln!(out, "targets:");
    for (id, target) in graph.targets() {
        let _ = writeln!(
            out,
            "  {} ({}) -> {} [{}]",
            target.name,
            target.kind,
            target.artifact.display(),
            status(&stale_targets, id)
        );
        for obj_id in graph.own_objects(id) {
            let obj = graph.object(obj_id);
            let _ = writeln!(
                out,
                "    {} -> {} [{}]",
                obj.source.display(),
                obj.path.display(),
                status(&stale_objects, obj_id)
            );
        }
    }

    let _ = writeln!(
        out,
        "plan: {} compile(s), {} link(s)",
        plan.compile_count(),
        plan.link_count()
    );
    out
}

/// Graphviz rendering of the raw graph.
pub fn render_dot(graph: &BuildGraph) -> String {
    format!("{}", Dot::new(graph.inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, RawBuildConfig};
    use crate::deps::DependencyTracker;
    use crate::fs::mock::MockFileSystem;
    use crate::graph::build_graph;
    use crate::plan::plan_build;
    use crate::probe::FlagSet;
    use crate::scan::scan_project;
    use crate::stale::StalenessEvaluator;

    #[test]
    fn text_and_dot_mention_every_target() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/common/util.c", "");
        fs.add_file("./src/appA/main.c", "");
        fs.add_file("./src/math_lib/add.c", "");

        let cfg = BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap();
        let scan = scan_project(&fs, &cfg).unwrap();
        let (graph, _) = build_graph(&scan, &cfg);
        let (tracker, _) = DependencyTracker::load(&fs, &graph);
        let eval = StalenessEvaluator::new(&fs, &tracker);
        let plan = plan_build(&graph, &cfg, &eval, &FlagSet::default());

        let text = render_text(&graph, &plan);
        assert!(text.contains("appA (executable)"));
        assert!(text.contains("math_lib (library)"));
        assert!(text.contains("common pool (1 objects)"));
        assert!(text.contains("[stale: object missing]"));
        assert!(text.contains("plan: 3 compile(s), 2 link(s)"));

        let dot = render_dot(&graph);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("<common pool>"));
        assert!(dot.contains("shares"));
    }
}
