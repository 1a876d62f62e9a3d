//! Test-runner detection and execution.
//!
//! A workspace is matched against an ordered table of ecosystem signatures.
//! The first signature that yields a [`TestPlan`] wins; later signatures are
//! never consulted, so exactly one test command runs per workspace. A
//! workspace that matches nothing gets a successful `RunnerKind::None`
//! outcome.
//!
//! | Order | Signature                                   | Command                          |
//! |-------|---------------------------------------------|----------------------------------|
//! | 1     | `pom.xml`                                   | `mvn test`, else `mvnw` wrapper  |
//! | 2     | `build.gradle` / `build.gradle.kts`         | `gradle test`, else `gradlew`    |
//! | 3     | `package.json` with `scripts.test`          | `npm test`                       |
//! | 4     | `requirements.txt`, `pytest.ini`, `tests/`, `test/` | `python -m pytest -v --tb=short` |
//! | 5     | `*.sln` / `*.csproj`                        | `dotnet test`                    |
//! | 6     | `go.mod`                                    | `go test ./...`                  |
//! | 7     | `Makefile` with a `test:` target            | `make test`                      |

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::models::{RunnerKind, TestOutcome};
use crate::process::{CommandRunner, args};

static MAKE_TEST_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^test[ \t]*:").expect("static regex is valid")
});

/// Host platform, used to choose between `mvnw` and `mvnw.cmd` style wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }
}

/// The single test command selected for a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    pub kind: RunnerKind,
    pub program: String,
    pub args: Vec<String>,
}

impl TestPlan {
    fn new(kind: RunnerKind, program: impl Into<String>, program_args: &[&str]) -> Self {
        Self {
            kind,
            program: program.into(),
            args: args(program_args),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a signature predicate can see: the workspace and the host toolchain.
struct Probe<'a> {
    dir: &'a Path,
    runner: &'a dyn CommandRunner,
    platform: Platform,
}

impl Probe<'_> {
    fn has_file(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    fn has_dir(&self, name: &str) -> bool {
        self.dir.join(name).is_dir()
    }

    fn has_tool(&self, name: &str) -> bool {
        self.runner.has_program(name)
    }

    /// Absolute path of the wrapper script for this platform, if present.
    fn wrapper(&self, unix: &str, windows: &str) -> Option<String> {
        let name = match self.platform {
            Platform::Unix => unix,
            Platform::Windows => windows,
        };
        let path = self.dir.join(name);
        path.is_file().then(|| path.to_string_lossy().to_string())
    }

    fn has_glob(&self, pattern: &str) -> bool {
        let full = format!(
            "{}/{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            pattern
        );
        glob::glob(&full)
            .map(|mut paths| paths.any(|p| p.is_ok()))
            .unwrap_or(false)
    }
}

/// A named ecosystem signature. `detect` is both predicate and plan builder.
struct Signature {
    name: &'static str,
    detect: fn(&Probe<'_>) -> Option<TestPlan>,
}

const SIGNATURES: &[Signature] = &[
    Signature { name: "maven", detect: detect_maven },
    Signature { name: "gradle", detect: detect_gradle },
    Signature { name: "npm", detect: detect_npm },
    Signature { name: "pytest", detect: detect_pytest },
    Signature { name: "dotnet", detect: detect_dotnet },
    Signature { name: "go", detect: detect_go },
    Signature { name: "make", detect: detect_make },
];

fn detect_maven(probe: &Probe<'_>) -> Option<TestPlan> {
    if !probe.has_file("pom.xml") {
        return None;
    }
    if probe.has_tool("mvn") {
        return Some(TestPlan::new(RunnerKind::Maven, "mvn", &["test"]));
    }
    match probe.wrapper("mvnw", "mvnw.cmd") {
        Some(wrapper) => Some(TestPlan::new(RunnerKind::MavenWrapper, wrapper, &["test"])),
        None => {
            warn!("pom.xml found but neither mvn nor a Maven wrapper is available");
            None
        }
    }
}

fn detect_gradle(probe: &Probe<'_>) -> Option<TestPlan> {
    if !probe.has_file("build.gradle") && !probe.has_file("build.gradle.kts") {
        return None;
    }
    if probe.has_tool("gradle") {
        return Some(TestPlan::new(RunnerKind::Gradle, "gradle", &["test"]));
    }
    match probe.wrapper("gradlew", "gradlew.bat") {
        Some(wrapper) => Some(TestPlan::new(RunnerKind::GradleWrapper, wrapper, &["test"])),
        None => {
            warn!("Gradle build found but neither gradle nor a Gradle wrapper is available");
            None
        }
    }
}

fn detect_npm(probe: &Probe<'_>) -> Option<TestPlan> {
    let content = std::fs::read_to_string(probe.dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "package.json is not valid JSON, skipping npm detection");
            return None;
        }
    };
    let has_test_script = manifest
        .get("scripts")
        .and_then(|s| s.get("test"))
        .and_then(|t| t.as_str())
        .is_some_and(|t| !t.trim().is_empty());
    has_test_script.then(|| TestPlan::new(RunnerKind::Npm, "npm", &["test"]))
}

fn detect_pytest(probe: &Probe<'_>) -> Option<TestPlan> {
    let found = probe.has_file("requirements.txt")
        || probe.has_file("pytest.ini")
        || probe.has_dir("tests")
        || probe.has_dir("test");
    found.then(|| TestPlan::new(RunnerKind::Pytest, "python", &["-m", "pytest", "-v", "--tb=short"]))
}

fn detect_dotnet(probe: &Probe<'_>) -> Option<TestPlan> {
    (probe.has_glob("*.sln") || probe.has_glob("*.csproj"))
        .then(|| TestPlan::new(RunnerKind::Dotnet, "dotnet", &["test"]))
}

fn detect_go(probe: &Probe<'_>) -> Option<TestPlan> {
    probe
        .has_file("go.mod")
        .then(|| TestPlan::new(RunnerKind::Go, "go", &["test", "./..."]))
}

fn detect_make(probe: &Probe<'_>) -> Option<TestPlan> {
    let content = std::fs::read_to_string(probe.dir.join("Makefile")).ok()?;
    MAKE_TEST_TARGET
        .is_match(&content)
        .then(|| TestPlan::new(RunnerKind::Make, "make", &["test"]))
}

/// Detects and runs the project's native test tooling.
#[derive(Clone)]
pub struct TestDetector {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
}

impl TestDetector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_platform(runner, Platform::current())
    }

    pub fn with_platform(runner: Arc<dyn CommandRunner>, platform: Platform) -> Self {
        Self { runner, platform }
    }

    /// Select the test command for `dir` without running anything.
    pub fn detect(&self, dir: &Path) -> Option<TestPlan> {
        let probe = Probe {
            dir,
            runner: self.runner.as_ref(),
            platform: self.platform,
        };
        SIGNATURES.iter().find_map(|signature| {
            let plan = (signature.detect)(&probe);
            if plan.is_some() {
                debug!(signature = signature.name, "test signature matched");
            }
            plan
        })
    }

    /// Detect and run the workspace's tests. Never fails: spawn errors become a
    /// failed outcome, and "no tests found" is a successful one.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn run(&self, dir: &Path) -> TestOutcome {
        let Some(plan) = self.detect(dir) else {
            info!("no automated test setup detected");
            return TestOutcome::none();
        };
        self.execute(&plan, dir).await
    }

    pub async fn execute(&self, plan: &TestPlan, dir: &Path) -> TestOutcome {
        info!(kind = %plan.kind, command = %plan.command_line(), "running tests");
        match self.runner.run(&plan.program, &plan.args, dir).await {
            Ok(output) => {
                if output.success() {
                    info!(kind = %plan.kind, "tests passed");
                } else {
                    warn!(kind = %plan.kind, exit_code = output.exit_code, "tests failed");
                }
                TestOutcome {
                    success: output.success(),
                    kind: plan.kind,
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
            Err(e) => {
                warn!(kind = %plan.kind, error = %e, "test command could not be started");
                TestOutcome {
                    success: false,
                    kind: plan.kind,
                    stdout: String::new(),
                    stderr: format!("{:#}", e),
                }
            }
        }
    }
}
