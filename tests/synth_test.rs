use anyhow::Result;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

use fortunas_infra::config::StageConfig;
use fortunas_infra::stacks;

fn testing_config() -> StageConfig {
    serde_json::from_value(json!({
        "stage": "testing",
        "domain_name": "testing.fortunasbet.com",
        "hosted_zone_id": "Z0123456789ABCDEFGHIJ",
        "certificate_arn": "arn:aws:acm:eu-west-1:123456789012:certificate/aaaa",
        "edge_certificate_arn": "arn:aws:acm:us-east-1:123456789012:certificate/bbbb",
        "callback_urls": ["https://testing.fortunasbet.com/auth/callback"],
        "logout_urls": ["https://testing.fortunasbet.com/"],
        "escalation_email": "oncall@fortunasbet.com"
    }))
    .unwrap()
}

fn production_config() -> StageConfig {
    serde_json::from_value(json!({
        "stage": "production",
        "domain_name": "fortunasbet.com",
        "hosted_zone_id": "Z0123456789ABCDEFGHIJ",
        "certificate_arn": "arn:aws:acm:eu-west-1:123456789012:certificate/cccc",
        "edge_certificate_arn": "arn:aws:acm:us-east-1:123456789012:certificate/dddd",
        "callback_urls": ["https://fortunasbet.com/auth/callback"],
        "logout_urls": ["https://fortunasbet.com/"],
        "escalation_email": "oncall@fortunasbet.com"
    }))
    .unwrap()
}

/// Collect every Ref / Fn::GetAtt target appearing anywhere in the document
fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                out.push(id.clone());
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(id)) = parts.first() {
                    out.push(id.clone());
                }
            }
            for child in map.values() {
                collect_references(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

#[test]
fn test_synth_produces_the_expected_resource_graph() -> Result<()> {
    let template = stacks::synthesize(&testing_config())?;
    let doc = template.render();
    let resources = doc["Resources"].as_object().unwrap();

    // One descriptor per expected resource kind
    for (logical_id, resource_type) in [
        ("SiteBucket", "AWS::S3::Bucket"),
        ("SiteBucketPolicy", "AWS::S3::BucketPolicy"),
        ("SiteDistribution", "AWS::CloudFront::Distribution"),
        ("SpaRewriteFunction", "AWS::CloudFront::Function"),
        ("UserPool", "AWS::Cognito::UserPool"),
        ("UserPoolClient", "AWS::Cognito::UserPoolClient"),
        ("UserPoolDomain", "AWS::Cognito::UserPoolDomain"),
        ("DataTable", "AWS::DynamoDB::Table"),
        ("ApiFunction", "AWS::Lambda::Function"),
        ("HttpApi", "AWS::ApiGatewayV2::Api"),
        ("SiteAliasA", "AWS::Route53::RecordSet"),
        ("AlertTopic", "AWS::SNS::Topic"),
        ("Dashboard", "AWS::CloudWatch::Dashboard"),
    ] {
        let resource = resources
            .get(logical_id)
            .unwrap_or_else(|| panic!("missing resource {}", logical_id));
        assert_eq!(resource["Type"], resource_type, "{}", logical_id);
    }
    Ok(())
}

#[test]
fn test_resource_names_are_deterministic_prefix_stage_kind() -> Result<()> {
    let template = stacks::synthesize(&testing_config())?;
    let doc = template.render();
    let resources = &doc["Resources"];

    assert_eq!(
        resources["SiteBucket"]["Properties"]["BucketName"],
        "fortunasbet-testing-site"
    );
    assert_eq!(
        resources["ApiFunction"]["Properties"]["FunctionName"],
        "fortunasbet-testing-api"
    );
    assert_eq!(
        resources["DataTable"]["Properties"]["TableName"],
        "fortunasbet-testing-data"
    );
    assert_eq!(
        resources["AlertTopic"]["Properties"]["TopicName"],
        "fortunasbet-testing-alerts"
    );

    // Synthesizing twice yields the same logical ids in the same order
    let again = stacks::synthesize(&testing_config())?;
    assert_eq!(template.logical_ids(), again.logical_ids());
    Ok(())
}

#[test]
fn test_every_reference_targets_a_known_id() -> Result<()> {
    let template = stacks::synthesize(&testing_config())?;
    let doc = template.render();

    let mut references = Vec::new();
    collect_references(&doc["Resources"], &mut references);
    assert!(!references.is_empty());

    let parameters: Vec<&str> = doc["Parameters"]
        .as_object()
        .map(|p| p.keys().map(String::as_str).collect())
        .unwrap_or_default();

    for reference in references {
        let resolvable = template.has(&reference)
            || parameters.contains(&reference.as_str())
            || reference.starts_with("AWS::");
        assert!(resolvable, "dangling reference: {}", reference);
    }
    Ok(())
}

#[test]
fn test_callback_urls_are_wired_into_the_pool_client() -> Result<()> {
    let template = stacks::synthesize(&testing_config())?;
    let doc = template.render();

    assert_eq!(
        doc["Resources"]["UserPoolClient"]["Properties"]["CallbackURLs"],
        json!(["https://testing.fortunasbet.com/auth/callback"])
    );
    assert_eq!(
        doc["Resources"]["UserPoolDomain"]["Properties"]["Domain"],
        "auth.testing.fortunasbet.com"
    );
    Ok(())
}

#[test]
fn test_production_stage_adds_www_records() -> Result<()> {
    let testing = stacks::synthesize(&testing_config())?;
    assert!(!testing.has("WwwAliasA"));

    let production = stacks::synthesize(&production_config())?;
    assert!(production.has("WwwAliasA"));
    assert!(production.has("WwwAliasAAAA"));

    let doc = production.render();
    let aliases = &doc["Resources"]["SiteDistribution"]["Properties"]["DistributionConfig"]["Aliases"];
    assert_eq!(aliases, &json!(["fortunasbet.com", "www.fortunasbet.com"]));
    Ok(())
}

#[test]
fn test_artifact_is_written_and_parses() -> Result<()> {
    let out_dir = tempdir()?;
    let template = stacks::synthesize(&testing_config())?;
    let artifact = template.write(out_dir.path(), "testing")?;

    assert!(artifact.ends_with("testing.template.json"));
    let written: Value = serde_json::from_str(&fs::read_to_string(&artifact)?)?;
    assert_eq!(written["AWSTemplateFormatVersion"], "2010-09-09");
    assert!(written["Resources"].as_object().unwrap().len() > 20);
    Ok(())
}

#[test]
fn test_missing_config_in_ci_aborts_with_description() {
    std::env::remove_var("FORTUNAS_STAGE_CONFIG");
    std::env::set_var("CI", "true");

    let err = StageConfig::load("testing").unwrap_err();
    assert!(err.to_string().contains("FORTUNAS_STAGE_CONFIG"));
    assert!(err.to_string().contains("automated environment"));

    std::env::remove_var("CI");
}
