use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use stack_core::artifact::{bundle_directory, Artifact, ArtifactBuilder};
use stack_core::settings::DeploymentSettings;
use stack_core::synth::synthesize;

/// Packages the source directory as-is, standing in for the container build.
struct DirectoryBuilder;

impl ArtifactBuilder for DirectoryBuilder {
    fn build(&self, source_dir: &Path, staging_dir: &Path) -> Result<Artifact, String> {
        bundle_directory(source_dir, source_dir, staging_dir)
    }
}

fn code_dir(root: &Path) -> std::path::PathBuf {
    let dir = root.join("src");
    fs::create_dir_all(&dir).expect("code dir");
    fs::write(dir.join("Dockerfile"), "FROM public.ecr.aws/lambda/python:3.9\n").expect("write");
    fs::write(dir.join("handler.py"), "def handler(event, context):\n    return {}\n")
        .expect("write");
    dir
}

fn synth_template(settings: &mut DeploymentSettings) -> (tempfile::TempDir, Value) {
    let root = tempfile::tempdir().expect("root");
    settings.code_dir = code_dir(root.path());
    let out_dir = root.path().join("cdk.out");

    let summary = synthesize(settings, &DirectoryBuilder, &out_dir).expect("synthesis should pass");
    let template: Value =
        serde_json::from_slice(&fs::read(&summary.template_path).expect("read template"))
            .expect("template is json");
    (root, template)
}

fn resources_of_type<'a>(template: &'a Value, resource_type: &str) -> Vec<&'a Value> {
    template["Resources"]
        .as_object()
        .expect("resources object")
        .values()
        .filter(|resource| resource["Type"] == resource_type)
        .collect()
}

fn list_tags(resource: &Value) -> Vec<(String, String)> {
    resource["Properties"]["Tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .map(|tag| {
                    (
                        tag["Key"].as_str().expect("key").to_string(),
                        tag["Value"].as_str().expect("value").to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn scenario_minimal_function_without_buckets() {
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.memory = 512;
    settings.timeout = 10;
    let (_root, template) = synth_template(&mut settings);

    let functions = resources_of_type(&template, "AWS::Lambda::Function");
    assert_eq!(functions.len(), 1);
    let function = &functions[0]["Properties"];
    assert_eq!(function["MemorySize"], 512);
    assert_eq!(function["Timeout"], 10);
    assert!(function.get("ReservedConcurrentExecutions").is_none());

    assert_eq!(resources_of_type(&template, "AWS::ApiGatewayV2::Api").len(), 1);
    let routes = resources_of_type(&template, "AWS::ApiGatewayV2::Route");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["Properties"]["RouteKey"], "$default");
    assert!(resources_of_type(&template, "AWS::IAM::Policy").is_empty());

    assert_eq!(
        list_tags(functions[0]),
        vec![
            ("Project".to_string(), "api".to_string()),
            ("Stack".to_string(), "prod".to_string()),
        ]
    );
    let api = resources_of_type(&template, "AWS::ApiGatewayV2::Api")[0];
    assert_eq!(
        api["Properties"]["Tags"],
        json!({ "Project": "api", "Stack": "prod" })
    );
}

#[test]
fn scenario_bucket_prefix_grants_read_access() {
    let mut settings = DeploymentSettings::new("x", "dev");
    settings.buckets = vec!["logs-".to_string()];
    let (_root, template) = synth_template(&mut settings);

    let policies = resources_of_type(&template, "AWS::IAM::Policy");
    assert_eq!(policies.len(), 1);
    let statements = policies[0]["Properties"]["PolicyDocument"]["Statement"]
        .as_array()
        .expect("statements");
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0]["Action"], json!(["s3:GetObject"]));
    assert_eq!(statements[0]["Resource"], json!(["arn:aws:s3:::logs-*"]));
}

#[test]
fn scenario_empty_owner_is_not_tagged() {
    let mut settings = DeploymentSettings::new("svc", "qa");
    settings.owner = Some(String::new());
    settings.client = Some("acme".to_string());
    let (_root, template) = synth_template(&mut settings);

    for resource_type in ["AWS::Lambda::Function", "AWS::IAM::Role"] {
        let tags = list_tags(resources_of_type(&template, resource_type)[0]);
        assert!(tags.contains(&("Client".to_string(), "acme".to_string())));
        assert!(tags.iter().all(|(key, _)| key != "Owner"));
        assert!(tags.iter().all(|(_, value)| !value.is_empty()));
    }
}

#[test]
fn concurrency_limit_and_environment_pass_through() {
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.max_concurrent = Some(25);
    settings
        .env
        .insert("LOG_LEVEL".to_string(), "debug".to_string());
    let (_root, template) = synth_template(&mut settings);

    let functions = resources_of_type(&template, "AWS::Lambda::Function");
    let function = &functions[0]["Properties"];
    assert_eq!(function["ReservedConcurrentExecutions"], 25);
    assert_eq!(
        function["Environment"],
        json!({ "Variables": { "LOG_LEVEL": "debug" } })
    );
}

#[test]
fn endpoint_output_and_assembly_files_are_written() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());
    let out_dir = root.path().join("cdk.out");

    let summary = synthesize(&settings, &DirectoryBuilder, &out_dir).expect("synthesis should pass");

    assert_eq!(summary.stack_id, "api-prod");
    assert!(summary.endpoint.get("Fn::Join").is_some());
    assert!(out_dir.join("manifest.json").is_file());
    assert!(out_dir.join("api-prod.assets.json").is_file());

    let assets: Value =
        serde_json::from_slice(&fs::read(out_dir.join("api-prod.assets.json")).expect("read"))
            .expect("assets json");
    let (hash, file) = assets["files"]
        .as_object()
        .expect("files")
        .iter()
        .next()
        .expect("one asset");
    let bundle = file["source"]["path"].as_str().expect("path");
    assert_eq!(bundle, format!("asset.{hash}.zip"));
    assert!(out_dir.join(bundle).is_file());

    let template: Value =
        serde_json::from_slice(&fs::read(&summary.template_path).expect("read")).expect("json");
    assert_eq!(template["Outputs"]["Endpoint"]["Value"], summary.endpoint);
}

#[test]
fn rerun_replaces_previous_assembly() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());
    let out_dir = root.path().join("cdk.out");

    synthesize(&settings, &DirectoryBuilder, &out_dir).expect("first run");
    fs::write(out_dir.join("stale.txt"), "old").expect("write stale file");
    synthesize(&settings, &DirectoryBuilder, &out_dir).expect("second run");

    assert!(!out_dir.join("stale.txt").exists());
    assert!(out_dir.join("api-prod.template.json").is_file());
}

#[test]
fn failed_run_keeps_previous_assembly_untouched_by_partial_output() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());
    let out_dir = root.path().join("cdk.out");
    synthesize(&settings, &DirectoryBuilder, &out_dir).expect("first run");

    settings.timeout = 0;
    synthesize(&settings, &DirectoryBuilder, &out_dir).expect_err("invalid settings");

    assert!(out_dir.join("api-prod.template.json").is_file());
    let leftovers: Vec<_> = fs::read_dir(root.path())
        .expect("read root")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".synth-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn output_dir_equal_to_code_dir_is_refused_and_code_is_kept() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());

    for out_dir in [settings.code_dir.clone(), root.path().to_path_buf()] {
        let error = synthesize(&settings, &DirectoryBuilder, &out_dir)
            .expect_err("output over the code directory should fail");
        assert!(error.to_string().contains("must not be or contain the code directory"));
    }

    assert!(settings.code_dir.join("handler.py").is_file());
    assert!(settings.code_dir.join("Dockerfile").is_file());
}

#[test]
fn foreign_output_dir_is_refused_and_left_intact() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());
    let out_dir = root.path().join("docs");
    fs::create_dir_all(&out_dir).expect("out dir");
    fs::write(out_dir.join("README.md"), "keep me").expect("write");

    let error = synthesize(&settings, &DirectoryBuilder, &out_dir)
        .expect_err("non-assembly directory should be refused");

    assert!(error.to_string().contains("does not hold a previous cloud assembly"));
    assert_eq!(
        fs::read_to_string(out_dir.join("README.md")).expect("read"),
        "keep me"
    );
    assert!(!out_dir.join("manifest.json").exists());
}

#[test]
fn empty_output_dir_is_filled() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());
    let out_dir = root.path().join("cdk.out");
    fs::create_dir_all(&out_dir).expect("out dir");

    synthesize(&settings, &DirectoryBuilder, &out_dir).expect("synthesis should pass");

    assert!(out_dir.join("manifest.json").is_file());
}

/// Records what the build context held when the build ran.
struct ListingBuilder {
    seen: std::cell::RefCell<Vec<String>>,
}

impl ArtifactBuilder for ListingBuilder {
    fn build(&self, source_dir: &Path, staging_dir: &Path) -> Result<Artifact, String> {
        let names = fs::read_dir(source_dir)
            .map_err(|error| error.to_string())?
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        *self.seen.borrow_mut() = names;
        assert!(!staging_dir.starts_with(source_dir));
        bundle_directory(source_dir, source_dir, staging_dir)
    }
}

#[test]
fn default_output_inside_code_dir_keeps_staging_out_of_build_context() {
    let root = tempfile::tempdir().expect("root");
    let mut settings = DeploymentSettings::new("api", "prod");
    settings.code_dir = code_dir(root.path());
    let out_dir = settings.code_dir.join("cdk.out");
    let builder = ListingBuilder {
        seen: std::cell::RefCell::new(Vec::new()),
    };

    synthesize(&settings, &builder, &out_dir).expect("synthesis should pass");

    let seen = builder.seen.borrow();
    assert!(seen.iter().any(|name| name == "handler.py"));
    assert!(seen.iter().all(|name| !name.starts_with(".synth-")));
    assert!(!seen.iter().any(|name| name == "cdk.out"));
    assert!(out_dir.join("manifest.json").is_file());
}
