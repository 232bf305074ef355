use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use tracing::{debug, warn};

use crate::constants;
use crate::error::{Result, SynthError};

/// Environment variable automated pipelines supply the stage configuration in
pub const STAGE_CONFIG_ENV: &str = "FORTUNAS_STAGE_CONFIG";

/// Per-stage configuration record. Everything the synthesizers need that is not
/// derivable from the stage label itself lives here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    /// Stage label this record belongs to, e.g. `testing`
    pub stage: String,
    /// Fully qualified domain the site is served from, e.g. `testing.fortunasbet.com`
    pub domain_name: String,
    /// Hosted zone the DNS records are published into
    pub hosted_zone_id: String,
    /// Certificate for the regional API endpoint
    pub certificate_arn: String,
    /// us-east-1 certificate used by the distribution and the auth domain
    pub edge_certificate_arn: String,
    /// OAuth callback URLs registered on the pool client
    pub callback_urls: Vec<String>,
    /// Sign-out redirect URLs registered on the pool client
    pub logout_urls: Vec<String>,
    /// E-mail address alarm notifications escalate to
    pub escalation_email: String,
    /// Origins the HTTP API allows; defaults to the site origin when absent
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
}

impl StageConfig {
    /// Resolve the configuration for a stage.
    ///
    /// Automated pipelines supply the record as JSON in `FORTUNAS_STAGE_CONFIG`;
    /// locally it is read from `config/<stage>.json`. In an automated environment
    /// (`CI` set) a missing record aborts synthesis immediately.
    pub fn load(stage: &str) -> Result<Self> {
        if !constants::is_known_stage(stage) {
            warn!(stage, "stage label is not one of the known environments");
        }

        let raw = match std::env::var(STAGE_CONFIG_ENV) {
            Ok(value) => {
                debug!("loading stage configuration from {}", STAGE_CONFIG_ENV);
                value
            }
            Err(_) if std::env::var("CI").is_ok() => {
                return Err(SynthError::Config(format!(
                    "running in an automated environment but {} is not set; \
                     refusing to synthesize stage '{}' without configuration",
                    STAGE_CONFIG_ENV, stage
                )));
            }
            Err(_) => {
                let path = format!("config/{}.json", stage);
                fs::read_to_string(&path).map_err(|e| {
                    SynthError::Config(format!("failed to read config file '{}': {}", path, e))
                })?
            }
        };

        let value: Value = serde_json::from_str(&raw)?;
        validate_against_schema(&value)?;

        let config: StageConfig = serde_json::from_value(value)?;
        if config.stage != stage {
            return Err(SynthError::Config(format!(
                "configuration is for stage '{}' but stage '{}' was requested",
                config.stage, stage
            )));
        }
        Ok(config)
    }

    /// Origins the HTTP API should allow, falling back to the site origin
    pub fn allowed_origins(&self) -> Vec<String> {
        match &self.cors_origins {
            Some(origins) => origins.clone(),
            None => vec![format!("https://{}", self.domain_name)],
        }
    }

    /// Custom domain the authentication pool is served from
    pub fn auth_domain(&self) -> String {
        format!("auth.{}", self.domain_name)
    }
}

/// Schema the stage configuration record must satisfy before deserialization
fn stage_config_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "stage",
            "domain_name",
            "hosted_zone_id",
            "certificate_arn",
            "edge_certificate_arn",
            "callback_urls",
            "logout_urls",
            "escalation_email"
        ],
        "properties": {
            "stage": { "type": "string", "minLength": 1 },
            "domain_name": { "type": "string", "minLength": 1 },
            "hosted_zone_id": { "type": "string", "minLength": 1 },
            "certificate_arn": { "type": "string", "pattern": "^arn:aws:acm:" },
            "edge_certificate_arn": { "type": "string", "pattern": "^arn:aws:acm:us-east-1:" },
            "callback_urls": {
                "type": "array",
                "items": { "type": "string", "format": "uri" },
                "minItems": 1
            },
            "logout_urls": {
                "type": "array",
                "items": { "type": "string", "format": "uri" }
            },
            "escalation_email": { "type": "string", "pattern": "^[^@]+@[^@]+$" },
            "cors_origins": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "additionalProperties": false
    })
}

// jsonschema 0.17 expects a schema with 'static lifetime; leak the parsed
// schema once at first use
static COMPILED_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    let schema: &'static Value = Box::leak(Box::new(stage_config_schema()));
    JSONSchema::options()
        .compile(schema)
        .expect("stage config schema is valid")
});

fn validate_against_schema(instance: &Value) -> Result<()> {
    if let Err(errors) = COMPILED_SCHEMA.validate(instance) {
        let details: Vec<String> = errors
            .map(|e| format!("{} (at {})", e, e.instance_path))
            .collect();
        return Err(SynthError::Config(format!(
            "stage configuration failed validation: {}",
            details.join("; ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        json!({
            "stage": "testing",
            "domain_name": "testing.fortunasbet.com",
            "hosted_zone_id": "Z0123456789ABCDEFGHIJ",
            "certificate_arn": "arn:aws:acm:eu-west-1:123456789012:certificate/aaaa",
            "edge_certificate_arn": "arn:aws:acm:us-east-1:123456789012:certificate/bbbb",
            "callback_urls": ["https://testing.fortunasbet.com/auth/callback"],
            "logout_urls": ["https://testing.fortunasbet.com/"],
            "escalation_email": "oncall@fortunasbet.com"
        })
    }

    #[test]
    fn test_sample_config_passes_schema() {
        assert!(validate_against_schema(&sample()).is_ok());
    }

    #[test]
    fn test_missing_hosted_zone_fails_schema() {
        let mut cfg = sample();
        cfg.as_object_mut().unwrap().remove("hosted_zone_id");
        let err = validate_against_schema(&cfg).unwrap_err();
        assert!(err.to_string().contains("hosted_zone_id"));
    }

    #[test]
    fn test_edge_certificate_must_be_us_east_1() {
        let mut cfg = sample();
        cfg["edge_certificate_arn"] =
            json!("arn:aws:acm:eu-west-1:123456789012:certificate/bbbb");
        assert!(validate_against_schema(&cfg).is_err());
    }

    #[test]
    fn test_allowed_origins_defaults_to_site_origin() {
        let config: StageConfig = serde_json::from_value(sample()).unwrap();
        assert_eq!(
            config.allowed_origins(),
            vec!["https://testing.fortunasbet.com".to_string()]
        );
    }

    #[test]
    fn test_auth_domain_is_prefixed() {
        let config: StageConfig = serde_json::from_value(sample()).unwrap();
        assert_eq!(config.auth_domain(), "auth.testing.fortunasbet.com");
    }
}
