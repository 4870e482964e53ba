// src/stale/mod.rs

//! Staleness evaluator.
//!
//! Decides, from modification times and dependency records only, whether an
//! object must be recompiled or a target relinked. Every rule errs on the
//! side of rebuilding. Equal timestamps count as fresh.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use crate::deps::DependencyTracker;
use crate::fs::FileSystem;
use crate::graph::{BuildGraph, NodeId};

/// Why an object has to be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileReason {
    ObjectMissing,
    SourceNewer,
    RecordInvalid,
    HeaderNewer(PathBuf),
    HeaderMissing(PathBuf),
    /// Compiler or flags differ from the ones recorded at the last compile.
    CommandChanged,
}

impl fmt::Display for CompileReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileReason::ObjectMissing => f.write_str("object missing"),
            CompileReason::SourceNewer => f.write_str("source newer than object"),
            CompileReason::RecordInvalid => f.write_str("dependency record missing or invalid"),
            CompileReason::HeaderNewer(h) => write!(f, "header {} changed", h.display()),
            CompileReason::HeaderMissing(h) => write!(f, "header {} disappeared", h.display()),
            CompileReason::CommandChanged => f.write_str("compile command changed"),
        }
    }
}

/// Why a target has to be linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkReason {
    ArtifactMissing,
    ObjectNewer(PathBuf),
    ObjectRecompiled(PathBuf),
}

impl fmt::Display for LinkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkReason::ArtifactMissing => f.write_str("artifact missing"),
            LinkReason::ObjectNewer(o) => write!(f, "object {} newer than artifact", o.display()),
            LinkReason::ObjectRecompiled(o) => write!(f, "object {} recompiled", o.display()),
        }
    }
}

pub struct StalenessEvaluator<'a> {
    fs: &'a dyn FileSystem,
    tracker: &'a DependencyTracker,
}

impl<'a> StalenessEvaluator<'a> {
    pub fn new(fs: &'a dyn FileSystem, tracker: &'a DependencyTracker) -> Self {
        Self { fs, tracker }
    }

    /// `None` when the object is fresh.
    ///
    /// `signature` is the fingerprint of the command that would compile the
    /// object now; a record stamped with a different one is stale.
    pub fn needs_compile(
        &self,
        graph: &BuildGraph,
        object: NodeId,
        signature: &str,
    ) -> Option<CompileReason> {
        let obj = graph.object(object);

        let Some(object_time) = self.mtime(&obj.path) else {
            return Some(CompileReason::ObjectMissing);
        };

        match self.mtime(&obj.source) {
            Some(source_time) if source_time <= object_time => {}
            _ => return Some(CompileReason::SourceNewer),
        }

        let Some(record) = self.tracker.record(object) else {
            return Some(CompileReason::RecordInvalid);
        };

        for header in &record.headers {
            match self.mtime(header) {
                None => return Some(CompileReason::HeaderMissing(header.clone())),
                Some(t) if t > object_time => {
                    return Some(CompileReason::HeaderNewer(header.clone()));
                }
                Some(_) => {}
            }
        }

        if record.signature.as_deref() != Some(signature) {
            return Some(CompileReason::CommandChanged);
        }

        trace!(object = ?obj.path, "object fresh");
        None
    }

    /// `None` when the target's artifact is fresh.
    ///
    /// `recompiled` holds every object that will be (or was) compiled in the
    /// current run; any of them feeding the target forces a relink even when
    /// timestamps tie.
    pub fn needs_link(
        &self,
        graph: &BuildGraph,
        target: NodeId,
        recompiled: &HashSet<NodeId>,
    ) -> Option<LinkReason> {
        let artifact = &graph.target(target).artifact;
        let Some(artifact_time) = self.mtime(artifact) else {
            return Some(LinkReason::ArtifactMissing);
        };

        for id in graph.target_objects(target) {
            let obj = graph.object(id);
            if recompiled.contains(&id) {
                return Some(LinkReason::ObjectRecompiled(obj.path.clone()));
            }
            match self.mtime(&obj.path) {
                Some(t) if t <= artifact_time => {}
                _ => return Some(LinkReason::ObjectNewer(obj.path.clone())),
            }
        }

        None
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        self.fs.modified(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, RawBuildConfig};
    use crate::fs::mock::MockFileSystem;
    use crate::graph::build_graph;
    use crate::scan::scan_project;

    const SIG: &str = "abc";

    fn setup(fs: &MockFileSystem) -> BuildGraph {
        let cfg = BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap();
        let scan = scan_project(fs, &cfg).unwrap();
        build_graph(&scan, &cfg).0
    }

    fn only_object(graph: &BuildGraph) -> NodeId {
        graph.objects()[0]
    }

    /// Source, header, then object and a stamped record: a fresh build.
    fn fresh_tree() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("./src/app/main.c", "int main(){}");
        fs.add_file("./include/app/app.h", "");
        fs.add_file("./build/obj/app/main.c.o", "obj");
        fs.add_file(
            "./build/obj/app/main.c.d",
            format!(
                "./build/obj/app/main.c.o: ./src/app/main.c ./include/app/app.h\n# dirbuild-signature: {SIG}\n"
            ),
        );
        fs
    }

    fn evaluate(fs: &MockFileSystem) -> Option<CompileReason> {
        let graph = setup(fs);
        let (tracker, _) = DependencyTracker::load(fs, &graph);
        StalenessEvaluator::new(fs, &tracker).needs_compile(&graph, only_object(&graph), SIG)
    }

    #[test]
    fn fresh_object_needs_nothing() {
        assert_eq!(evaluate(&fresh_tree()), None);
    }

    #[test]
    fn each_rule_marks_object_stale() {
        let fs = fresh_tree();
        fs.remove_file(Path::new("./build/obj/app/main.c.o")).unwrap();
        assert_eq!(evaluate(&fs), Some(CompileReason::ObjectMissing));

        let fs = fresh_tree();
        fs.touch("./src/app/main.c");
        assert_eq!(evaluate(&fs), Some(CompileReason::SourceNewer));

        let fs = fresh_tree();
        fs.remove_file(Path::new("./build/obj/app/main.c.d")).unwrap();
        assert_eq!(evaluate(&fs), Some(CompileReason::RecordInvalid));

        let fs = fresh_tree();
        fs.touch("./include/app/app.h");
        assert_eq!(
            evaluate(&fs),
            Some(CompileReason::HeaderNewer(PathBuf::from("./include/app/app.h")))
        );

        let fs = fresh_tree();
        fs.remove_file(Path::new("./include/app/app.h")).unwrap();
        assert!(matches!(evaluate(&fs), Some(CompileReason::HeaderMissing(_))));
    }

    #[test]
    fn different_signature_is_stale() {
        let fs = fresh_tree();
        let graph = setup(&fs);
        let (tracker, _) = DependencyTracker::load(&fs, &graph);
        let eval = StalenessEvaluator::new(&fs, &tracker);
        assert_eq!(
            eval.needs_compile(&graph, only_object(&graph), "def"),
            Some(CompileReason::CommandChanged)
        );
    }

    #[test]
    fn equal_timestamps_are_not_stale() {
        let fs = fresh_tree();
        fs.set_mtime("./src/app/main.c", 50);
        fs.set_mtime("./include/app/app.h", 50);
        fs.set_mtime("./build/obj/app/main.c.o", 50);
        assert_eq!(evaluate(&fs), None);
    }

    #[test]
    fn link_staleness() {
        let fs = fresh_tree();
        let graph = setup(&fs);
        let (tracker, _) = DependencyTracker::load(&fs, &graph);
        let eval = StalenessEvaluator::new(&fs, &tracker);
        let target = graph.target_id("app").unwrap();
        let none = HashSet::new();

        assert_eq!(
            eval.needs_link(&graph, target, &none),
            Some(LinkReason::ArtifactMissing)
        );

        fs.add_file(&graph.target(target).artifact, "exe");
        assert_eq!(eval.needs_link(&graph, target, &none), None);

        let recompiled: HashSet<_> = [only_object(&graph)].into_iter().collect();
        assert!(matches!(
            eval.needs_link(&graph, target, &recompiled),
            Some(LinkReason::ObjectRecompiled(_))
        ));

        fs.touch("./build/obj/app/main.c.o");
        assert!(matches!(
            eval.needs_link(&graph, target, &none),
            Some(LinkReason::ObjectNewer(_))
        ));
    }
}
