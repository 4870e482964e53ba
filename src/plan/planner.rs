// src/plan/planner.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::graph::{BuildGraph, NodeId};
use crate::probe::FlagSet;
use crate::stale::{CompileReason, LinkReason, StalenessEvaluator};
use crate::types::{Language, TargetKind};

use super::action::{ActionId, ActionKind, CompileRequest, LinkRequest, ScheduledAction};

/// Ordered actions for one invocation plus the reasons behind them.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    /// Compiles (common pool first, then targets by name), then library
    /// links, then executable links.
    pub actions: Vec<ScheduledAction>,
    pub stale_objects: Vec<(NodeId, CompileReason)>,
    pub stale_targets: Vec<(NodeId, LinkReason)>,
    /// Names of targets that need no work.
    pub up_to_date: Vec<String>,
}

impl BuildPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn compile_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_compile()).count()
    }

    pub fn link_count(&self) -> usize {
        self.actions.len() - self.compile_count()
    }
}

/// The command that would compile `object` right now.
pub fn compile_request(
    graph: &BuildGraph,
    config: &BuildConfig,
    flags: &FlagSet,
    object: NodeId,
) -> CompileRequest {
    let obj = graph.object(object);
    let tc = &config.toolchain;

    let (program, base_flags) = match obj.language {
        Language::C => (&tc.cc, &tc.cflags),
        Language::Cxx => (&tc.cxx, &tc.cxxflags),
        Language::Asm => (&tc.cc, &tc.asflags),
    };

    let mut all_flags = base_flags.clone();
    if obj.language != Language::Asm {
        all_flags.extend(flags.cflags.iter().cloned());
    }

    CompileRequest {
        source: obj.source.clone(),
        object: obj.path.clone(),
        record: obj.record.clone(),
        language: obj.language,
        program: program.clone(),
        include_paths: graph.include_paths().to_vec(),
        flags: all_flags,
    }
}

/// The command that would link `target` right now.
///
/// C++ objects anywhere in the link input select the C++ driver. Executables
/// also search the artifact directory so they can link project libraries.
pub fn link_request(
    graph: &BuildGraph,
    config: &BuildConfig,
    flags: &FlagSet,
    target: NodeId,
) -> LinkRequest {
    let t = graph.target(target);
    let tc = &config.toolchain;
    let objects = graph.target_objects(target);

    let has_cxx = objects
        .iter()
        .any(|&id| graph.object(id).language.is_cxx());
    let program = if has_cxx { &tc.cxx } else { &tc.cc };

    let mut library_paths = graph.library_paths().to_vec();
    let mut libs = Vec::new();
    if t.kind == TargetKind::Executable {
        library_paths.push(config.artifacts_root());
        libs = tc.libs.clone();
    }

    let mut link_flags = tc.ldflags.clone();
    link_flags.extend(flags.ldflags.iter().cloned());

    LinkRequest {
        target: t.name.clone(),
        kind: t.kind,
        program: program.clone(),
        objects: objects
            .iter()
            .map(|&id| graph.object(id).path.clone())
            .collect(),
        library_paths,
        flags: link_flags,
        libs,
        artifact: t.artifact.clone(),
    }
}

/// Decide the minimal set of compile and link actions.
pub fn plan_build(
    graph: &BuildGraph,
    config: &BuildConfig,
    evaluator: &StalenessEvaluator<'_>,
    flags: &FlagSet,
) -> BuildPlan {
    let mut plan = BuildPlan::default();
    let mut compile_ids: HashMap<NodeId, ActionId> = HashMap::new();

    for &object in graph.objects() {
        let request = compile_request(graph, config, flags, object);
        let Some(reason) = evaluator.needs_compile(graph, object, &request.signature()) else {
            continue;
        };
        debug!(source = ?request.source, %reason, "compile needed");

        let id = ActionId(plan.actions.len());
        compile_ids.insert(object, id);
        plan.stale_objects.push((object, reason));
        plan.actions.push(ScheduledAction {
            id,
            kind: ActionKind::Compile(request),
            requires: Vec::new(),
            after: Vec::new(),
        });
    }

    let recompiled: HashSet<NodeId> = compile_ids.keys().copied().collect();
    let mut library_links = Vec::new();

    // Libraries before executables so executables can wait on them.
    for kind in [TargetKind::Library, TargetKind::Executable] {
        for (target, t) in graph.targets().filter(|(_, t)| t.kind == kind) {
            let Some(reason) = evaluator.needs_link(graph, target, &recompiled) else {
                plan.up_to_date.push(t.name.clone());
                continue;
            };
            debug!(target = %t.name, %reason, "link needed");

            let requires = graph
                .target_objects(target)
                .iter()
                .filter_map(|obj| compile_ids.get(obj).copied())
                .collect();
            let after = if kind == TargetKind::Executable {
                library_links.clone()
            } else {
                Vec::new()
            };

            let id = ActionId(plan.actions.len());
            if kind == TargetKind::Library {
                library_links.push(id);
            }
            plan.stale_targets.push((target, reason));
            plan.actions.push(ScheduledAction {
                id,
                kind: ActionKind::Link(link_request(graph, config, flags, target)),
                requires,
                after,
            });
        }
    }

    info!(
        compiles = plan.compile_count(),
        links = plan.link_count(),
        up_to_date = plan.up_to_date.len(),
        "build planned"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawBuildConfig;
    use crate::deps::DependencyTracker;
    use crate::fs::mock::MockFileSystem;
    use crate::graph::build_graph;
    use crate::scan::scan_project;

    fn plan_for(fs: &MockFileSystem) -> (BuildGraph, BuildPlan) {
        let cfg = BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap();
        let scan = scan_project(fs, &cfg).unwrap();
        let (graph, _) = build_graph(&scan, &cfg);
        let (tracker, _) = DependencyTracker::load(fs, &graph);
        let eval = StalenessEvaluator::new(fs, &tracker);
        let plan = plan_build(&graph, &cfg, &eval, &FlagSet::default());
        (graph, plan)
    }

    #[test]
    fn first_build_plans_everything_in_order() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/common/util.c", "");
        fs.add_file("./src/appA/main.c", "");
        fs.add_file("./src/appB/main.cpp", "");
        fs.add_file("./src/math_lib/add.c", "");

        let (_, plan) = plan_for(&fs);
        assert_eq!(plan.compile_count(), 4);
        assert_eq!(plan.link_count(), 3);

        let labels: Vec<_> = plan.actions.iter().map(|a| a.label()).collect();
        assert_eq!(
            labels,
            vec![
                "./src/common/util.c",
                "./src/appA/main.c",
                "./src/appB/main.cpp",
                "./src/math_lib/add.c",
                "math_lib",
                "appA",
                "appB",
            ]
        );

        // appA needs util.c and its own main.c, and waits for the library link.
        let app_a = &plan.actions[5];
        assert_eq!(app_a.requires, vec![ActionId(1), ActionId(0)]);
        assert_eq!(app_a.after, vec![ActionId(4)]);
    }

    #[test]
    fn cxx_objects_select_cxx_driver() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/common/util.c", "");
        fs.add_file("./src/appB/main.cpp", "");

        let (_, plan) = plan_for(&fs);
        let link = plan
            .actions
            .iter()
            .find_map(|a| match &a.kind {
                ActionKind::Link(l) => Some(l.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(link.program, "c++");
        assert!(link.library_paths.contains(&std::path::PathBuf::from("./build/bin")));
    }

    #[test]
    fn probe_flags_reach_every_compile() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/app/main.c", "");
        let cfg = BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap();
        let scan = scan_project(&fs, &cfg).unwrap();
        let (graph, _) = build_graph(&scan, &cfg);

        let flags = FlagSet {
            cflags: vec!["-DHAVE_ZLIB=1".to_string()],
            ..FlagSet::default()
        };
        let req = compile_request(&graph, &cfg, &flags, graph.objects()[0]);
        assert!(req.flags.contains(&"-DHAVE_ZLIB=1".to_string()));
        assert_ne!(
            req.signature(),
            compile_request(&graph, &cfg, &FlagSet::default(), graph.objects()[0]).signature()
        );
    }
}
