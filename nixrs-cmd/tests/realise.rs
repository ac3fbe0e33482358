use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::{Future, ready};
use std::sync::Arc;

use nixrs_cmd::{
    Error, EvalError, Evaluator, ExprSource, ExtendedOutputsSpec, Installable, InstallableAttrPath,
    NoEvaluator, OperateOn, PackageInfo, Realise, RealiseContext, Settings, SourceArgs,
    parse_installables, print_missing, throw_build_errors, to_built_paths,
};
use nixrs_core::build_result::{BuildError, BuildMode, BuildResult, BuildStatus, KeyedBuildResult};
use nixrs_core::built_path::{BuiltPath, SingleBuiltPath};
use nixrs_core::derived_path::{DerivedPath, OutputName, SingleDerivedPath};
use nixrs_core::log::Verbosity;
use nixrs_core::store::mock::{MockRequest, MockStore};
use nixrs_core::store_path::{StoreDir, StorePath, StorePathSet};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;
use rstest::rstest;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt as _};

fn path(s: &str) -> StorePath {
    s.parse().unwrap()
}

fn name(s: &str) -> OutputName {
    s.parse().unwrap()
}

fn built(drv: &str, outputs: &str) -> DerivedPath {
    DerivedPath::built(SingleDerivedPath::Opaque(path(drv)), outputs.parse().unwrap())
}

/// Records the message of every event emitted on this thread.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

impl Captured {
    fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    fn at(&self, level: Level) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().push((*event.metadata().level(), visitor.0));
    }
}

fn literals(strings: &[&str]) -> Vec<Arc<Installable>> {
    parse_installables(&StoreDir::default(), &SourceArgs::default(), strings).unwrap()
}

#[derive(Default)]
struct TestEvaluator {
    packages: BTreeMap<String, Vec<PackageInfo>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl TestEvaluator {
    fn package(mut self, attr_path: &str, drv_path: &str, outputs: &[&str]) -> Self {
        self.packages
            .entry(attr_path.to_owned())
            .or_default()
            .push(PackageInfo {
                drv_path: path(drv_path),
                outputs_to_install: outputs.iter().map(|o| name(o)).collect(),
            });
        self
    }

    fn read_only_flags(&self) -> Vec<bool> {
        self.calls.lock().iter().map(|(_, read_only)| *read_only).collect()
    }
}

impl Evaluator for TestEvaluator {
    fn eval_derivations<'a>(
        &'a self,
        _source: &'a ExprSource,
        attr_path: &'a str,
        read_only: bool,
    ) -> impl Future<Output = Result<Vec<PackageInfo>, EvalError>> + 'a {
        self.calls.lock().push((attr_path.to_owned(), read_only));
        ready(
            self.packages
                .get(attr_path)
                .cloned()
                .ok_or_else(|| EvalError::Custom(format!("no attribute '{attr_path}'"))),
        )
    }
}

fn attrs(attr_paths: &[&str]) -> Vec<Arc<Installable>> {
    let source = Arc::new(ExprSource::Expr("import ./. {}".into()));
    attr_paths
        .iter()
        .map(|attr_path| {
            Arc::new(
                InstallableAttrPath::new(source.clone(), attr_path, ExtendedOutputsSpec::Default)
                    .into(),
            )
        })
        .collect()
}

fn quiet() -> Settings {
    Settings {
        print_missing: false,
        ..Settings::default()
    }
}

fn hello_store() -> MockStore {
    MockStore::builder()
        .add_output(
            path("00000000000000000000000000000000-hello.drv"),
            "out",
            Some(path("11111111111111111111111111111111-hello")),
        )
        .add_output(
            path("00000000000000000000000000000000-hello.drv"),
            "man",
            Some(path("22222222222222222222222222222222-hello-man")),
        )
        .add_valid_path(path("33333333333333333333333333333333-src"))
        .build()
}

#[test_log::test(tokio::test)]
async fn shared_paths_are_built_once() {
    let store = hello_store();
    let evaluator = TestEvaluator::default()
        .package("hello", "00000000000000000000000000000000-hello.drv", &["out"])
        .package("alias", "00000000000000000000000000000000-hello.drv", &["out"]);
    let mut installables = attrs(&["hello"]);
    installables.extend(literals(&["/nix/store/33333333333333333333333333333333-src"]));
    installables.extend(attrs(&["alias"]));

    let context = RealiseContext::new(&store, &store, &evaluator);
    let results = context
        .build2(Realise::Outputs, BuildMode::Normal, &installables)
        .await
        .unwrap();

    let p1 = built("00000000000000000000000000000000-hello.drv", "out");
    let p2 = DerivedPath::Opaque(path("33333333333333333333333333333333-src"));
    assert_eq!(store.build_calls(), vec![vec![p1.clone(), p2]]);

    assert_eq!(results.len(), 3);
    assert!(Arc::ptr_eq(&results[0].0, &installables[0]));
    assert!(Arc::ptr_eq(&results[1].0, &installables[2]));
    assert!(Arc::ptr_eq(&results[2].0, &installables[1]));
    assert_eq!(results[0].1.info.attr_path.as_deref(), Some("hello"));
    assert_eq!(results[1].1.info.attr_path.as_deref(), Some("alias"));
    assert_eq!(results[2].1.info.attr_path, None);
    assert_eq!(results[0].1.path, results[1].1.path);
    assert_eq!(
        results[0].1.result.as_ref().map(|keyed| &keyed.path),
        Some(&p1)
    );
    assert_eq!(
        results[0].1.path.out_paths(),
        StorePathSet::from([path("11111111111111111111111111111111-hello")])
    );
}

#[test_log::test(tokio::test)]
async fn built_outputs_are_filtered() {
    let drv = built("00000000000000000000000000000000-hello.drv", "out");
    let store = MockStore::builder()
        .add_output(
            path("00000000000000000000000000000000-hello.drv"),
            "out",
            Some(path("11111111111111111111111111111111-hello")),
        )
        .add_build_result(
            drv,
            BuildResult::new(BuildStatus::Built, String::new())
                .with_output(name("out"), path("11111111111111111111111111111111-hello"))
                .with_output(name("man"), path("22222222222222222222222222222222-hello-man")),
        )
        .build();
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, quiet());
    let installables = literals(&["/nix/store/00000000000000000000000000000000-hello.drv^out"]);
    let results = context
        .build(Realise::Outputs, BuildMode::Normal, &installables)
        .await
        .unwrap();
    assert_eq!(
        to_built_paths(&results),
        vec![BuiltPath::Built {
            drv_path: Arc::new(SingleBuiltPath::Opaque(path(
                "00000000000000000000000000000000-hello.drv"
            ))),
            outputs: BTreeMap::from([(
                name("out"),
                path("11111111111111111111111111111111-hello")
            )]),
        }]
    );
}

#[test_log::test(tokio::test)]
async fn single_failure_is_raised_unchanged() {
    let failing = DerivedPath::Opaque(path("44444444444444444444444444444444-broken"));
    let store = MockStore::builder()
        .add_build_result(
            failing,
            BuildResult::new(
                BuildStatus::PermanentFailure,
                "builder for 'broken' failed with exit code 1".into(),
            ),
        )
        .build();
    let context = RealiseContext::new(&store, &store, NoEvaluator);
    let err = context
        .build2(
            Realise::Outputs,
            BuildMode::Normal,
            &literals(&["/nix/store/44444444444444444444444444444444-broken"]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Build(BuildError {
            status: BuildStatus::PermanentFailure,
            msg: "builder for 'broken' failed with exit code 1".into(),
        })
    );
}

#[test_log::test(tokio::test)]
async fn several_failures_are_summarised() {
    let x = "/nix/store/44444444444444444444444444444444-x";
    let y = "/nix/store/55555555555555555555555555555555-y";
    let store = MockStore::builder()
        .add_build_result(
            DerivedPath::Opaque(path("44444444444444444444444444444444-x")),
            BuildResult::new(BuildStatus::PermanentFailure, "x failed".into()),
        )
        .add_build_result(
            DerivedPath::Opaque(path("55555555555555555555555555555555-y")),
            BuildResult::new(BuildStatus::TimedOut, "y timed out".into()),
        )
        .build();
    let context = RealiseContext::new(&store, &store, NoEvaluator);
    let err = context
        .build2(Realise::Outputs, BuildMode::Normal, &literals(&[x, y]))
        .await
        .unwrap_err();
    assert_eq!(err, Error::BuildFailures(vec![x.into(), y.into()]));
    let msg = err.to_string();
    assert!(msg.contains(x));
    assert!(msg.contains(y));
}

#[test_log::test(tokio::test)]
async fn store_path_needs_exactly_one_path() {
    let store = hello_store();
    let evaluator = TestEvaluator::default().package(
        "hello",
        "00000000000000000000000000000000-hello.drv",
        &["out", "man"],
    );
    let context = RealiseContext::with_settings(&store, &store, &evaluator, quiet());
    let installable = attrs(&["hello"]).remove(0);
    let err = context
        .to_store_path(Realise::Outputs, OperateOn::Output, installable.clone())
        .await
        .unwrap_err();
    assert_eq!(err, Error::NotOneStorePath("hello".into()));
    assert_eq!(
        err.to_string(),
        "argument 'hello' should evaluate to one store path"
    );

    let paths = context
        .to_store_paths(Realise::Outputs, OperateOn::Output, &[installable.clone(), installable])
        .await
        .unwrap();
    assert_eq!(
        paths,
        vec![
            path("22222222222222222222222222222222-hello-man"),
            path("11111111111111111111111111111111-hello"),
            path("22222222222222222222222222222222-hello-man"),
            path("11111111111111111111111111111111-hello"),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn store_path_single() {
    let store = hello_store();
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, quiet());
    let installable =
        literals(&["/nix/store/00000000000000000000000000000000-hello.drv^out"]).remove(0);
    let out = context
        .to_store_path(Realise::Outputs, OperateOn::Output, installable)
        .await
        .unwrap();
    assert_eq!(out, path("11111111111111111111111111111111-hello"));
}

#[test_log::test(tokio::test)]
async fn realise_nothing_never_builds() {
    let store = hello_store();
    let evaluator = TestEvaluator::default().package(
        "hello",
        "00000000000000000000000000000000-hello.drv",
        &["out"],
    );
    let context = RealiseContext::new(&store, &store, &evaluator);
    let results = context
        .build2(Realise::Nothing, BuildMode::Normal, &attrs(&["hello"]))
        .await
        .unwrap();
    assert!(store.build_calls().is_empty());
    assert_eq!(evaluator.read_only_flags(), vec![true]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1.result, None);
    assert_eq!(
        results[0].1.path.out_paths(),
        StorePathSet::from([path("11111111111111111111111111111111-hello")])
    );
    assert!(
        store
            .requests()
            .iter()
            .all(|request| !matches!(request, MockRequest::BuildPathsWithResults { .. }))
    );
}

#[test_log::test(tokio::test)]
async fn realise_derivation_keeps_read_only_setting() {
    let store = hello_store();
    let evaluator = TestEvaluator::default().package(
        "hello",
        "00000000000000000000000000000000-hello.drv",
        &["out"],
    );
    let context = RealiseContext::new(&store, &store, &evaluator);
    context
        .build2(Realise::Derivation, BuildMode::Normal, &attrs(&["hello"]))
        .await
        .unwrap();
    assert!(store.build_calls().is_empty());
    assert_eq!(evaluator.read_only_flags(), vec![false]);
}

fn nested_store() -> MockStore {
    MockStore::builder()
        .add_output(
            path("00000000000000000000000000000000-gen.drv"),
            "out",
            Some(path("11111111111111111111111111111111-inner.drv")),
        )
        .add_output(
            path("11111111111111111111111111111111-inner.drv"),
            "bin",
            Some(path("22222222222222222222222222222222-inner-bin")),
        )
        .build()
}

#[rstest]
#[case::outputs(Realise::Outputs)]
#[case::nothing(Realise::Nothing)]
#[case::derivation(Realise::Derivation)]
#[tokio::test]
async fn nested_derivation_resolves_inner_level_once(#[case] mode: Realise) {
    let gen_drv = path("00000000000000000000000000000000-gen.drv");
    let inner_drv = path("11111111111111111111111111111111-inner.drv");
    let store = nested_store();
    let context = RealiseContext::new(&store, &store, NoEvaluator);
    assert!(context.settings.print_missing);
    let installables = literals(&["/nix/store/00000000000000000000000000000000-gen.drv^out^bin"]);
    let results = context
        .build(mode, BuildMode::Normal, &installables)
        .await
        .unwrap();
    assert_eq!(store.output_map_queries(&gen_drv), 1);
    assert_eq!(store.output_map_queries(&inner_drv), 1);
    assert_eq!(
        results[0].path.out_paths(),
        StorePathSet::from([path("22222222222222222222222222222222-inner-bin")])
    );
    let BuiltPath::Built { drv_path, .. } = &results[0].path else {
        panic!("expected built path");
    };
    assert_eq!(drv_path.out_path(), &inner_drv);
}

#[test_log::test(tokio::test)]
async fn quiet_build_skips_output_maps_of_built_level() {
    let store = nested_store();
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, quiet());
    context
        .build(
            Realise::Outputs,
            BuildMode::Normal,
            &literals(&["/nix/store/00000000000000000000000000000000-gen.drv^out^bin"]),
        )
        .await
        .unwrap();
    assert_eq!(
        store.output_map_queries(&path("00000000000000000000000000000000-gen.drv")),
        1
    );
    assert_eq!(
        store.output_map_queries(&path("11111111111111111111111111111111-inner.drv")),
        0
    );
}

#[test_log::test(tokio::test)]
async fn derivations_use_deriver() {
    let store = MockStore::builder()
        .add_valid_path(path("33333333333333333333333333333333-src"))
        .add_deriver(
            path("33333333333333333333333333333333-src"),
            path("77777777777777777777777777777777-src.drv"),
        )
        .add_deriver(
            path("33333333333333333333333333333333-src"),
            path("66666666666666666666666666666666-src.drv"),
        )
        .add_output(
            path("00000000000000000000000000000000-hello.drv"),
            "out",
            Some(path("11111111111111111111111111111111-hello")),
        )
        .build();
    let context = RealiseContext::new(&store, &store, NoEvaluator);
    let installables = literals(&[
        "/nix/store/33333333333333333333333333333333-src",
        "/nix/store/00000000000000000000000000000000-hello.drv^out",
        "/nix/store/88888888888888888888888888888888-other.drv",
    ]);
    let drvs = context.to_derivations(&installables, true).await.unwrap();
    assert_eq!(
        drvs,
        StorePathSet::from([
            path("66666666666666666666666666666666-src.drv"),
            path("00000000000000000000000000000000-hello.drv"),
            path("88888888888888888888888888888888-other.drv"),
        ])
    );

    let err = context
        .to_derivations(&installables[..1], false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::NotADerivation("/nix/store/33333333333333333333333333333333-src".into())
    );

    let built = context
        .to_built_paths(Realise::Nothing, OperateOn::Derivation, &installables[..1])
        .await
        .unwrap();
    assert_eq!(
        built,
        vec![BuiltPath::Opaque(path("66666666666666666666666666666666-src.drv"))]
    );
    assert!(store.build_calls().is_empty());
}

#[test_log::test(tokio::test)]
async fn missing_deriver() {
    let store = MockStore::builder()
        .add_valid_path(path("33333333333333333333333333333333-src"))
        .build();
    let context = RealiseContext::new(&store, &store, NoEvaluator);
    let err = context
        .to_derivations(&literals(&["/nix/store/33333333333333333333333333333333-src"]), true)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "'/nix/store/33333333333333333333333333333333-src' does not have a known deriver"
    );
}

#[test_log::test(tokio::test)]
async fn interrupted_before_expansion() {
    let store = hello_store();
    let evaluator = TestEvaluator::default().package(
        "hello",
        "00000000000000000000000000000000-hello.drv",
        &["out"],
    );
    let interrupt = CancellationToken::new();
    let context = RealiseContext::new(&store, &store, &evaluator).with_interrupt(interrupt.clone());
    interrupt.cancel();
    let err = context
        .build2(Realise::Outputs, BuildMode::Normal, &attrs(&["hello"]))
        .await
        .unwrap_err();
    assert_eq!(err, Error::Interrupted);
    assert!(evaluator.calls.lock().is_empty());
    assert!(store.requests().is_empty());
}

#[test_log::test(tokio::test)]
async fn evaluation_errors_propagate() {
    let store = hello_store();
    let evaluator = TestEvaluator::default();
    let context = RealiseContext::new(&store, &store, &evaluator);
    let err = context
        .build2(Realise::Outputs, BuildMode::Normal, &attrs(&["nope"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Eval(EvalError::Custom("no attribute 'nope'".into()))
    );
    assert!(store.build_calls().is_empty());
}

#[rstest]
#[case::default(false)]
#[case::keep_going(true)]
#[tokio::test]
async fn build_options_are_forwarded(#[case] keep_going: bool) {
    let store = hello_store();
    let settings = Settings {
        keep_going,
        ..quiet()
    };
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, settings);
    context
        .build2(
            Realise::Outputs,
            BuildMode::Repair,
            &literals(&["/nix/store/33333333333333333333333333333333-src"]),
        )
        .await
        .unwrap();
    assert_eq!(
        store.requests(),
        vec![MockRequest::BuildPathsWithResults {
            paths: vec![DerivedPath::Opaque(path("33333333333333333333333333333333-src"))],
            mode: BuildMode::Repair,
            keep_going,
        }]
    );
}

#[tokio::test]
async fn each_failure_is_logged_once() {
    let captured = Captured::default();
    let _guard = captured.install();
    let store = MockStore::builder()
        .add_build_result(
            DerivedPath::Opaque(path("44444444444444444444444444444444-x")),
            BuildResult::new(BuildStatus::PermanentFailure, "x failed".into()),
        )
        .add_build_result(
            DerivedPath::Opaque(path("55555555555555555555555555555555-y")),
            BuildResult::new(BuildStatus::TimedOut, "y timed out".into()),
        )
        .add_build_result(
            DerivedPath::Opaque(path("66666666666666666666666666666666-z")),
            BuildResult::new(BuildStatus::DependencyFailed, String::new()),
        )
        .build();
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, quiet());
    let err = context
        .build2(
            Realise::Outputs,
            BuildMode::Normal,
            &literals(&[
                "/nix/store/44444444444444444444444444444444-x",
                "/nix/store/55555555555555555555555555555555-y",
                "/nix/store/66666666666666666666666666666666-z",
            ]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BuildFailures(ref paths) if paths.len() == 3));
    assert_eq!(
        captured.at(Level::ERROR),
        vec!["x failed".to_string(), "y timed out".to_string()]
    );
}

#[tokio::test]
async fn single_failure_is_not_logged() {
    let captured = Captured::default();
    let _guard = captured.install();
    let results = vec![KeyedBuildResult {
        path: DerivedPath::Opaque(path("44444444444444444444444444444444-x")),
        result: BuildResult::new(BuildStatus::PermanentFailure, "x failed".into()),
    }];
    throw_build_errors(&StoreDir::default(), &results).unwrap_err();
    assert!(captured.at(Level::ERROR).is_empty());
}

#[rstest]
#[case::nothing(Realise::Nothing, Level::ERROR)]
#[case::derivation(Realise::Derivation, Level::ERROR)]
#[case::outputs(Realise::Outputs, Level::INFO)]
#[tokio::test]
async fn missing_report_level_follows_mode(#[case] mode: Realise, #[case] level: Level) {
    let captured = Captured::default();
    let _guard = captured.install();
    let absent = DerivedPath::Opaque(path("77777777777777777777777777777777-absent"));
    let store = MockStore::builder()
        .add_build_result(absent, BuildResult::new(BuildStatus::Substituted, String::new()))
        .build();
    let context = RealiseContext::new(&store, &store, NoEvaluator);
    context
        .build2(
            mode,
            BuildMode::Normal,
            &literals(&["/nix/store/77777777777777777777777777777777-absent"]),
        )
        .await
        .unwrap();
    let lines = captured.at(level);
    assert!(lines.contains(&"paths missing from the store:".to_string()));
    assert!(lines.contains(&"  /nix/store/77777777777777777777777777777777-absent".to_string()));
    let other = if level == Level::ERROR {
        Level::INFO
    } else {
        Level::ERROR
    };
    assert!(
        captured
            .at(other)
            .iter()
            .all(|line| !line.contains("77777777777777777777777777777777-absent"))
    );
}

#[tokio::test]
async fn print_missing_uses_requested_level() {
    let captured = Captured::default();
    let _guard = captured.install();
    let store = MockStore::default();
    let paths = vec![DerivedPath::Opaque(path("77777777777777777777777777777777-absent"))];
    let missing = print_missing(&store, &store, &paths, Verbosity::Warn)
        .await
        .unwrap();
    assert_eq!(missing, paths);
    assert_eq!(
        captured.at(Level::WARN),
        vec![
            "paths missing from the store:".to_string(),
            "  /nix/store/77777777777777777777777777777777-absent".to_string(),
        ]
    );
    assert!(captured.at(Level::INFO).is_empty());
    assert!(captured.at(Level::ERROR).is_empty());
}

const POOL: [&str; 4] = [
    "/nix/store/00000000000000000000000000000000-a",
    "/nix/store/11111111111111111111111111111111-b",
    "/nix/store/22222222222222222222222222222222-c",
    "/nix/store/33333333333333333333333333333333-d",
];

#[test_log::test(test_strategy::proptest(async = "tokio"))]
async fn batch_is_first_occurrence_order(
    #[strategy(proptest::collection::vec(0usize..4, 1..12))] picks: Vec<usize>,
) -> TestCaseResult {
    let mut builder = MockStore::builder();
    for s in POOL {
        builder = builder.add_valid_path(StoreDir::default().parse(s).unwrap());
    }
    let store = builder.build();
    let strings: Vec<&str> = picks.iter().map(|i| POOL[*i]).collect();
    let installables = literals(&strings);
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, quiet());
    let results = context
        .build2(Realise::Outputs, BuildMode::Normal, &installables)
        .await
        .unwrap();

    let mut expected = Vec::new();
    let mut seen = BTreeSet::new();
    for i in picks.iter() {
        if seen.insert(*i) {
            expected.push(DerivedPath::Opaque(StoreDir::default().parse(POOL[*i]).unwrap()));
        }
    }
    let calls = store.build_calls();
    prop_assert_eq!(calls.len(), 1);
    prop_assert_eq!(&calls[0], &expected);
    prop_assert_eq!(results.len(), installables.len());
    for installable in installables.iter() {
        prop_assert_eq!(
            results
                .iter()
                .filter(|(owner, _)| Arc::ptr_eq(owner, installable))
                .count(),
            1
        );
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn store_errors_propagate() {
    let store = MockStore::builder()
        .build_error(nixrs_core::store::Error::custom("daemon went away"))
        .build();
    let context = RealiseContext::with_settings(&store, &store, NoEvaluator, quiet());
    let err = context
        .build2(
            Realise::Outputs,
            BuildMode::Normal,
            &literals(&["/nix/store/33333333333333333333333333333333-src"]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "daemon went away");
    assert_eq!(store.build_calls().len(), 1);
}
