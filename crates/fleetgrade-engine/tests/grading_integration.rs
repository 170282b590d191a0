//! Integration tests for the grading pipeline over real git repositories.

use std::path::Path;
use std::process::Command as StdCommand;

use fleetgrade_core::{EvalConfig, RepoSet, Repository, Result};
use fleetgrade_engine::{
    discover_and_sync, ForkSource, GradingOptions, GradingPipeline, ProcessRunner, RemoteRepo,
    ReportTable,
};

fn run_git(repo_dir: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a git repository under `root/name` with a `marker.txt` holding
/// `content`, optionally tagged.
fn make_repo(root: &Path, name: &str, content: &str, tag: Option<&str>) -> Repository {
    let dir = root.join(name);
    std::fs::create_dir(&dir).unwrap();
    run_git(&dir, &["init", "--initial-branch", "main"]);
    run_git(&dir, &["config", "user.name", "test-user"]);
    run_git(&dir, &["config", "user.email", "test@example.com"]);
    std::fs::write(dir.join("marker.txt"), content).unwrap();
    run_git(&dir, &["add", "marker.txt"]);
    run_git(&dir, &["commit", "-m", "initial"]);
    if let Some(tag) = tag {
        run_git(&dir, &["tag", tag]);
    }
    Repository::new(name, dir)
}

fn config(doc: &str) -> EvalConfig {
    EvalConfig::from_json(doc).expect("config should parse")
}

#[tokio::test]
async fn full_run_grades_the_fleet_and_writes_the_report() {
    let root = tempfile::tempdir().unwrap();

    // fork-a carries the expected marker under tag v1; fork-b has a wrong
    // marker and no tags.
    let mut repos = RepoSet::new();
    repos
        .insert(make_repo(root.path(), "fork-a", "expected\n", Some("v1")))
        .unwrap();
    repos
        .insert(make_repo(root.path(), "fork-b", "wrong\n", None))
        .unwrap();

    let output_path = root.path().join("report.csv");
    let doc = format!(
        r#"{{
            "ranked_allowed_tags": ["v2", "v1"],
            "seq_tasks": [{{"commands": ["touch built.txt"]}}],
            "rules": {{
                "content": {{
                    "marker": {{
                        "checks": [{{"command": "cat marker.txt", "stdout": "expected"}}],
                        "weight": 2.0
                    }}
                }}
            }},
            "date_format": "%Y",
            "output": "{}"
        }}"#,
        output_path.display()
    );

    let report = GradingPipeline::run(&config(&doc), &repos, &GradingOptions::default())
        .await
        .unwrap();

    assert_eq!(report.repos, 2);
    assert_eq!(
        report.table.columns,
        vec!["name", "tag", "date", "content-marker"]
    );

    // Task stage side effect landed in both work trees.
    assert!(root.path().join("fork-a/built.txt").exists());
    assert!(root.path().join("fork-b/built.txt").exists());

    let written = ReportTable::load(&output_path).unwrap();
    assert_eq!(written.rows.len(), 2);

    // fork-a graded at v1 with full credit, fork-b on its branch with zero.
    assert_eq!(written.rows[0].get("name"), Some("fork-a"));
    assert_eq!(written.rows[0].get("tag"), Some("v1"));
    assert_eq!(written.rows[0].get("content-marker"), Some("2"));
    assert_eq!(written.rows[1].get("name"), Some("fork-b"));
    assert_eq!(written.rows[1].get("tag"), Some("main"));
    assert_eq!(written.rows[1].get("content-marker"), Some("0"));

    // Commit dates use the configured format verbatim.
    let date = written.rows[0].get("date").unwrap();
    assert_eq!(date.len(), 4);
    assert!(date.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn rerun_on_unchanged_trees_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let mut repos = RepoSet::new();
    repos
        .insert(make_repo(root.path(), "fork-a", "expected\n", None))
        .unwrap();

    let output_path = root.path().join("report.csv");
    let doc = format!(
        r#"{{
            "rules": {{
                "content": {{
                    "marker": {{
                        "checks": [
                            {{"command": "cat marker.txt", "stdout": "expected", "partial_weight": 3.0}},
                            {{"command": "cat absent.txt", "stdout": "whatever"}}
                        ],
                        "partial_weights_allowed": true
                    }}
                }}
            }},
            "output": "{}"
        }}"#,
        output_path.display()
    );
    let config = config(&doc);
    let options = GradingOptions::default();

    let first = GradingPipeline::run(&config, &repos, &options).await.unwrap();
    let second = GradingPipeline::run(&config, &repos, &options).await.unwrap();

    assert_eq!(first.table, second.table);
    assert_eq!(first.rules_fingerprint, second.rules_fingerprint);
    assert_eq!(first.table.rows[0].get("content-marker"), Some("0.75"));
}

#[tokio::test]
async fn template_merge_shapes_the_written_report() {
    let root = tempfile::tempdir().unwrap();
    let mut repos = RepoSet::new();
    repos
        .insert(make_repo(root.path(), "fork-a", "expected\n", None))
        .unwrap();
    repos
        .insert(make_repo(root.path(), "fork-b", "expected\n", None))
        .unwrap();

    let template_path = root.path().join("template.csv");
    std::fs::write(
        &template_path,
        "name,note\nfork-b,graded late\nfork-a,\n,totals row\n",
    )
    .unwrap();

    let output_path = root.path().join("report.csv");
    let doc = format!(
        r#"{{
            "rules": {{
                "content": {{
                    "marker": {{
                        "checks": [{{"command": "cat marker.txt", "stdout": "expected"}}]
                    }}
                }}
            }},
            "output": "{}",
            "template": "{}"
        }}"#,
        output_path.display(),
        template_path.display()
    );

    GradingPipeline::run(&config(&doc), &repos, &GradingOptions::default())
        .await
        .unwrap();

    let written = ReportTable::load(&output_path).unwrap();
    assert_eq!(
        written.columns,
        vec!["name", "tag", "date", "content-marker", "note"]
    );

    let names: Vec<_> = written.rows.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec![Some("fork-b"), Some("fork-a"), None]);

    assert_eq!(written.rows[0].get("note"), Some("graded late"));
    assert_eq!(written.rows[0].get("content-marker"), Some("1"));
    assert_eq!(written.rows[2].get("note"), Some("totals row"));
}

#[tokio::test]
async fn skip_checks_leaves_score_columns_empty() {
    let root = tempfile::tempdir().unwrap();
    let mut repos = RepoSet::new();
    repos
        .insert(make_repo(root.path(), "fork-a", "expected\n", None))
        .unwrap();

    let output_path = root.path().join("report.csv");
    let doc = format!(
        r#"{{
            "prepare_commands": ["touch prepared.txt"],
            "seq_tasks": [{{"commands": ["touch built.txt"]}}],
            "rules": {{
                "content": {{
                    "marker": {{
                        "checks": [{{"command": "cat marker.txt", "stdout": "expected"}}]
                    }}
                }}
            }},
            "output": "{}"
        }}"#,
        output_path.display()
    );

    let options = GradingOptions {
        skip_checks: true,
        ..Default::default()
    };
    GradingPipeline::run(&config(&doc), &repos, &options)
        .await
        .unwrap();

    // The cascade skipped tasks and prepare commands too.
    assert!(!root.path().join("fork-a/built.txt").exists());
    assert!(!root.path().join("fork-a/prepared.txt").exists());

    let written = ReportTable::load(&output_path).unwrap();
    assert_eq!(written.rows[0].get("content-marker"), Some(""));
    assert_ne!(written.rows[0].get("tag"), Some(""));
}

/// Fake fleet source: an origin plus forks served from local paths.
struct LocalFleet {
    origin: RemoteRepo,
    forks: Vec<RemoteRepo>,
}

#[async_trait::async_trait]
impl ForkSource for LocalFleet {
    async fn origin(&self) -> Result<RemoteRepo> {
        Ok(self.origin.clone())
    }

    async fn list_forks(&self) -> Result<Vec<RemoteRepo>> {
        Ok(self.forks.clone())
    }
}

#[tokio::test]
async fn sync_barrier_clones_then_fetches() {
    let upstream_root = tempfile::tempdir().unwrap();
    let origin = make_repo(upstream_root.path(), "origin", "expected\n", Some("v1"));
    let fork = make_repo(upstream_root.path(), "student", "changed\n", None);

    let fleet = LocalFleet {
        origin: RemoteRepo {
            name: "origin".to_string(),
            clone_url: origin.location.display().to_string(),
        },
        forks: vec![RemoteRepo {
            name: "student".to_string(),
            clone_url: fork.location.display().to_string(),
        }],
    };

    let work_root = tempfile::tempdir().unwrap();
    let runner = ProcessRunner::new(true);

    let set = discover_and_sync(&fleet, &runner, work_root.path())
        .await
        .unwrap();
    assert_eq!(set.len(), 2);
    assert!(work_root.path().join("origin/marker.txt").exists());
    assert!(work_root.path().join("student/marker.txt").exists());

    // Second sync fetches in place instead of cloning.
    let set = discover_and_sync(&fleet, &runner, work_root.path())
        .await
        .unwrap();
    assert_eq!(set.len(), 2);

    let names: Vec<String> = set.iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["origin", "student"]);
}

#[tokio::test]
async fn sync_failure_is_fatal() {
    let fleet = LocalFleet {
        origin: RemoteRepo {
            name: "origin".to_string(),
            clone_url: "/nonexistent/upstream/path".to_string(),
        },
        forks: Vec::new(),
    };

    let work_root = tempfile::tempdir().unwrap();
    let runner = ProcessRunner::new(true);

    let result = discover_and_sync(&fleet, &runner, work_root.path()).await;
    assert!(result.is_err());
}
