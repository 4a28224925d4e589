//! End-to-end pipeline tests
//!
//! Each test lays out base/overlay configs in a scratch directory, runs the
//! pipeline and inspects the manifest on disk.

use std::fs;
use std::path::{Path, PathBuf};

use cloudrun_manifest::{
    Pipeline, PipelineConfig, PipelineError, RenderError, RenderOptions, ResourceKind,
};
use serde_yaml::Value;
use tempfile::TempDir;

const BASE: &str = r#"
runConfig:
  cpu: 1
  memoryMiB: 512
  maxInstances: 5
env:
  - variable: LOG_LEVEL
    value: info
serviceAccount: app@my-project.iam.gserviceaccount.com
"#;

const PROD: &str = r#"
runConfig:
  cpu: 2
  memoryMiB: 2048
  minInstances: 1
  concurrency: 40
env:
  - variable: LOG_LEVEL
    value: warn
  - variable: DB_PASSWORD
    secret: projects/123456789/secrets/DB_PASSWORD
cloudsqlConnector: my-project:us-central1:main
"#;

const JOB: &str = r#"
runConfig:
  cpu: 2
  memoryMiB: 1024
  taskCount: 4
  parallelism: 2
  maxRetries: 1
env:
  - variable: DB_PASSWORD
    secret: projects/123456789/secrets/DB_PASSWORD
"#;

const WORKER: &str = r#"
runConfig:
  cpu: 1
  maxInstances: 2
  network: default
  subnet: workers
env:
  - variable: QUEUE
    value: orders
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn pipeline(&self, overlay: &str, base: Option<&str>) -> Pipeline {
        Pipeline::new(PipelineConfig {
            config_path: self.write("overlay.yaml", overlay),
            base_path: base.map(|b| self.write("base.yaml", b)),
        })
    }
}

fn options(kind: &str, output_path: PathBuf) -> RenderOptions {
    RenderOptions {
        service_name: "orders".to_string(),
        region: "us-central1".to_string(),
        image: "us-docker.pkg.dev/my-project/apps/orders:v42".to_string(),
        resource_type: kind.to_string(),
        timeout_seconds: 120,
        output_path,
    }
}

fn read_yaml(path: &Path) -> Value {
    serde_yaml::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn yaml(s: &str) -> Value {
    serde_yaml::from_str(s).unwrap()
}

#[test]
fn test_service_from_base_and_overlay() {
    let ws = Workspace::new();
    let out = ws.path("deploy/orders.yaml");
    let outcome = ws
        .pipeline(PROD, Some(BASE))
        .run(&options("service", out.clone()))
        .unwrap();
    assert_eq!(outcome.kind, ResourceKind::Service);

    let manifest = read_yaml(&out);
    let template = &manifest["spec"]["template"];
    let annotations = &template["metadata"]["annotations"];

    // overlay wins on scalars, base-only keys survive
    assert_eq!(annotations["autoscaling.knative.dev/minScale"], yaml("'1'"));
    assert_eq!(annotations["autoscaling.knative.dev/maxScale"], yaml("'5'"));
    assert_eq!(
        annotations["run.googleapis.com/cloudsql-instances"],
        yaml("my-project:us-central1:main")
    );

    let spec = &template["spec"];
    assert_eq!(spec["containerConcurrency"], yaml("40"));
    assert_eq!(spec["timeoutSeconds"], yaml("120"));
    assert_eq!(
        spec["serviceAccountName"],
        yaml("app@my-project.iam.gserviceaccount.com")
    );

    let container = &spec["containers"][0];
    assert_eq!(container["resources"]["limits"]["cpu"], yaml("2000m"));
    assert_eq!(container["resources"]["limits"]["memory"], yaml("2048Mi"));

    // env list replaced wholesale by the overlay
    let env = container["env"].as_sequence().unwrap();
    assert_eq!(env.len(), 2);
    assert_eq!(env[0]["value"], yaml("warn"));
    assert_eq!(
        env[1]["valueFrom"]["secretKeyRef"]["name"],
        yaml("DB_PASSWORD")
    );
}

#[test]
fn test_image_on_a_single_line() {
    let ws = Workspace::new();
    let image = "us-docker.pkg.dev/my-project/apps/orders:v42";

    for (kind, overlay) in [("service", PROD), ("job", JOB), ("worker", WORKER)] {
        let out = ws.path(&format!("{kind}.yaml"));
        ws.pipeline(overlay, None)
            .run(&options(kind, out.clone()))
            .unwrap();

        // container entries serialize as `- image: ...` list items
        let text = fs::read_to_string(&out).unwrap();
        let image_lines: Vec<&str> = text
            .lines()
            .map(|line| line.trim_start())
            .map(|line| line.strip_prefix("- ").unwrap_or(line))
            .filter(|line| line.starts_with("image:"))
            .collect();
        assert_eq!(image_lines, vec![format!("image: {image}")], "{kind}");

        let manifest = read_yaml(&out);
        let containers = match kind {
            "job" => &manifest["spec"]["template"]["spec"]["template"]["spec"]["containers"],
            _ => &manifest["spec"]["template"]["spec"]["containers"],
        };
        assert_eq!(containers.as_sequence().unwrap().len(), image_lines.len());
    }
}

#[test]
fn test_render_is_byte_identical_across_runs() {
    let ws = Workspace::new();

    for (kind, overlay) in [("service", PROD), ("job", JOB), ("worker", WORKER)] {
        let pipeline = ws.pipeline(overlay, None);
        let first = ws.path(&format!("{kind}-1.yaml"));
        let second = ws.path(&format!("{kind}-2.yaml"));
        let a = pipeline.run(&options(kind, first.clone())).unwrap();
        let b = pipeline.run(&options(kind, second.clone())).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap(), "{kind}");
        assert_eq!(a.digest, b.digest);
    }
}

#[test]
fn test_counts_beyond_32_bits_render() {
    let ws = Workspace::new();

    let service_out = ws.path("service.yaml");
    ws.pipeline("runConfig:\n  maxInstances: 5000000000\n", None)
        .run(&options("service", service_out.clone()))
        .unwrap();
    let service = read_yaml(&service_out);
    assert_eq!(
        service["spec"]["template"]["metadata"]["annotations"]["autoscaling.knative.dev/maxScale"],
        yaml("'5000000000'")
    );

    let job_out = ws.path("job.yaml");
    ws.pipeline("runConfig:\n  timeoutSeconds: 4294967296\n", None)
        .run(&options("job", job_out.clone()))
        .unwrap();
    let job = read_yaml(&job_out);
    assert_eq!(
        job["spec"]["template"]["spec"]["template"]["spec"]["timeoutSeconds"],
        yaml("4294967296")
    );
}

#[test]
fn test_kind_dispatch() {
    let ws = Workspace::new();
    let overlay = "runConfig:\n  cpu: 2\n  maxInstances: 4\n";
    let job_overlay = "runConfig:\n  cpu: 2\n  taskCount: 3\n";

    let service_out = ws.path("service.yaml");
    ws.pipeline(overlay, None)
        .run(&options("service", service_out.clone()))
        .unwrap();
    let worker_out = ws.path("worker.yaml");
    ws.pipeline(overlay, None)
        .run(&options("worker", worker_out.clone()))
        .unwrap();
    let job_out = ws.path("job.yaml");
    ws.pipeline(job_overlay, None)
        .run(&options("job", job_out.clone()))
        .unwrap();

    let service = read_yaml(&service_out);
    let worker = read_yaml(&worker_out);
    let job = read_yaml(&job_out);

    assert_eq!(service["kind"], yaml("Service"));
    assert_eq!(worker["kind"], yaml("WorkerPool"));
    assert_eq!(job["kind"], yaml("Job"));

    // service and worker pool share scaling annotation placement
    let key = "autoscaling.knative.dev/maxScale";
    assert_eq!(
        service["spec"]["template"]["metadata"]["annotations"][key],
        worker["spec"]["template"]["metadata"]["annotations"][key]
    );

    let worker_text = fs::read_to_string(&worker_out).unwrap();
    let job_text = fs::read_to_string(&job_out).unwrap();
    assert!(!worker_text.contains("containerConcurrency"));
    assert!(!job_text.contains("containerConcurrency"));
    assert_eq!(job["spec"]["template"]["spec"]["taskCount"], yaml("3"));
}

#[test]
fn test_validation_failure_writes_nothing() {
    let ws = Workspace::new();
    let out = ws.path("out/orders.yaml");
    let err = ws
        .pipeline("runConfig:\n  cpu: 3\n  memoryMiB: 64\nbogus: true\n", None)
        .run(&options("service", out.clone()))
        .unwrap_err();

    match &err {
        PipelineError::Validation(report) => assert_eq!(report.violations.len(), 3),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert!(!out.exists());
}

#[test]
fn test_validation_uses_merged_document() {
    let ws = Workspace::new();
    // base alone is invalid for a job; the overlay fixes it
    let base = "runConfig:\n  taskCount: 0\n";
    let overlay = "runConfig:\n  taskCount: 2\n";
    let out = ws.path("job.yaml");

    ws.pipeline(overlay, Some(base))
        .run(&options("job", out.clone()))
        .unwrap();
    let job = read_yaml(&out);
    assert_eq!(job["spec"]["template"]["spec"]["taskCount"], yaml("2"));
}

#[test]
fn test_missing_image_is_option_error() {
    let ws = Workspace::new();
    let out = ws.path("orders.yaml");
    let mut opts = options("service", out.clone());
    opts.image = String::new();

    let err = ws.pipeline(PROD, None).run(&opts).unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("image"));
    assert!(matches!(
        err,
        PipelineError::Options(RenderError::MissingOption("image"))
    ));
    assert!(!out.exists());
}

#[test]
fn test_unknown_resource_type() {
    let ws = Workspace::new();
    let err = ws
        .pipeline(PROD, None)
        .run(&options("cronjob", ws.path("x.yaml")))
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("cronjob"));
    assert!(msg.contains("service, job, worker"));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_unparseable_overlay() {
    let ws = Workspace::new();
    let err = ws
        .pipeline("runConfig: [unclosed\n", None)
        .run(&options("service", ws.path("x.yaml")))
        .unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
    assert!(err.to_string().contains("overlay.yaml"));
}

#[test]
fn test_existing_manifest_untouched_on_failure() {
    let ws = Workspace::new();
    let out = ws.write("orders.yaml", "previous: manifest\n");

    let result = ws
        .pipeline("runConfig:\n  cpu: 16\n", None)
        .run(&options("service", out.clone()));
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&out).unwrap(), "previous: manifest\n");
}

#[test]
fn test_empty_overlay_renders_base() {
    let ws = Workspace::new();
    let out = ws.path("orders.yaml");
    ws.pipeline("", Some(BASE))
        .run(&options("service", out.clone()))
        .unwrap();

    let manifest = read_yaml(&out);
    let container = &manifest["spec"]["template"]["spec"]["containers"][0];
    assert_eq!(container["resources"]["limits"]["cpu"], yaml("1000m"));
    assert_eq!(container["env"][0]["value"], yaml("info"));
}

#[test]
fn test_merged_and_write_merged() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline(PROD, Some(BASE));

    let merged = pipeline.merged().unwrap();
    assert_eq!(merged.sources.len(), 2);
    assert_eq!(merged.document["runConfig"]["cpu"], yaml("2"));
    assert_eq!(merged.document["runConfig"]["maxInstances"], yaml("5"));

    let out = ws.path("merged/prod.yaml");
    pipeline.write_merged(&out).unwrap();
    assert_eq!(read_yaml(&out), merged.document);
}

#[test]
fn test_check_reports_without_rendering() {
    let ws = Workspace::new();
    let report = ws
        .pipeline("runConfig:\n  concurrency: 10\n", None)
        .check(ResourceKind::Job)
        .unwrap();

    assert!(!report.is_valid());
    assert_eq!(report.codes(), vec!["UNKNOWN_KEY:runConfig.concurrency"]);
}
