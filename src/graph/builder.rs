// src/graph/builder.rs

use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::graph::BuildGraph;
use crate::graph::node::{ObjectFile, Target, artifact_path, object_path, record_path};
use crate::report::Diagnostic;
use crate::scan::{ProjectScan, SourceFile};

/// Build the graph for a scanned project.
///
/// - One object per source (common pool first, then targets by name).
/// - Targets with no compilable source are skipped with a diagnostic.
/// - Sources owned by no target directory are left out of the graph
///   (the scanner already reported them).
///
/// The common pool is created once; targets only reference it.
pub fn build_graph(scan: &ProjectScan, config: &BuildConfig) -> (BuildGraph, Vec<Diagnostic>) {
    let mut graph = BuildGraph::new(scan.include_paths.clone(), scan.library_paths.clone());
    let mut diagnostics = Vec::new();

    for source in scan.common_sources() {
        add_source_and_object(&mut graph, config, source, true);
    }
    debug!(objects = graph.objects().len(), "common pool populated");

    for dir in &scan.targets {
        let sources: Vec<&SourceFile> = scan.sources_of(&dir.name).collect();
        if sources.is_empty() {
            warn!(target = %dir.name, "target directory has no compilable sources");
            diagnostics.push(Diagnostic::EmptyTarget {
                target: dir.name.clone(),
            });
            continue;
        }

        let own: Vec<_> = sources
            .into_iter()
            .filter_map(|s| add_source_and_object(&mut graph, config, s, false))
            .collect();

        let target = Target {
            name: dir.name.clone(),
            kind: dir.kind,
            dir: dir.path.clone(),
            artifact: artifact_path(config, &dir.name, dir.kind),
        };
        debug!(target = %target.name, kind = %target.kind, objects = own.len(), "target added");
        graph.add_target(target, &own);
    }

    info!(
        objects = graph.objects().len(),
        common = graph.common_pool().len(),
        targets = graph.targets().count(),
        "build graph constructed"
    );

    (graph, diagnostics)
}

fn add_source_and_object(
    graph: &mut BuildGraph,
    config: &BuildConfig,
    source: &SourceFile,
    common: bool,
) -> Option<crate::graph::NodeId> {
    let path = object_path(config, &source.path, source.language)?;
    let object = ObjectFile {
        record: record_path(&path),
        path,
        source: source.path.clone(),
        language: source.language,
        common,
    };
    let source_id = graph.add_source(source.clone());
    Some(graph.add_object(source_id, object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawBuildConfig;
    use crate::fs::mock::MockFileSystem;
    use crate::scan::scan_project;
    use crate::types::TargetKind;

    fn graph_for(fs: &MockFileSystem) -> (BuildGraph, Vec<Diagnostic>) {
        let cfg = BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap();
        let scan = scan_project(fs, &cfg).unwrap();
        build_graph(&scan, &cfg)
    }

    #[test]
    fn targets_share_one_common_pool() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/common/util.c", "");
        fs.add_file("./src/appA/main.c", "");
        fs.add_file("./src/appB/main.cpp", "");

        let (graph, diagnostics) = graph_for(&fs);
        assert!(diagnostics.is_empty());
        assert_eq!(graph.objects().len(), 3);
        assert_eq!(graph.common_pool().len(), 1);

        let a = graph.target_id("appA").unwrap();
        let b = graph.target_id("appB").unwrap();
        assert_eq!(graph.own_objects(a).len(), 1);
        assert_eq!(graph.target_objects(a).len(), 2);
        assert_eq!(graph.target_objects(b).len(), 2);

        let util = graph.common_pool()[0];
        assert_eq!(graph.dependents_of(util), vec![a, b]);
        assert_eq!(graph.dependents_of(graph.own_objects(b)[0]), vec![b]);
    }

    #[test]
    fn common_directory_is_never_a_target() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/common/util.c", "");
        fs.add_file("./src/app/main.c", "");

        let (graph, _) = graph_for(&fs);
        assert!(graph.target_id("common").is_none());
        let names: Vec<_> = graph.targets().map(|(_, t)| t.name.clone()).collect();
        assert_eq!(names, vec!["app".to_string()]);
    }

    #[test]
    fn empty_target_is_skipped_not_fatal() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/app/main.c", "");
        fs.add_file("./src/docs/README.md", "");

        let (graph, diagnostics) = graph_for(&fs);
        assert!(graph.target_id("docs").is_none());
        assert_eq!(
            diagnostics,
            vec![Diagnostic::EmptyTarget {
                target: "docs".to_string()
            }]
        );
    }

    #[test]
    fn library_suffix_selects_kind() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/math_lib/add.c", "");
        fs.add_file("./src/calc/main.c", "");

        let (graph, _) = graph_for(&fs);
        let lib = graph.target(graph.target_id("math_lib").unwrap());
        let exe = graph.target(graph.target_id("calc").unwrap());
        assert_eq!(lib.kind, TargetKind::Library);
        assert_eq!(exe.kind, TargetKind::Executable);
    }
}
