//! Template assembly: an ordered collection of resource descriptors rendered
//! to the provider-template JSON the deployment command consumes.
//!
//! References between descriptors (`Ref`, `Fn::GetAtt`) are plain JSON
//! fragments; the deployment tool resolves them and enforces that referenced
//! resources exist before the reference does.

use chrono::Utc;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SynthError};

/// Reference to another resource's primary identifier
pub fn ref_to(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// Reference to a named attribute of another resource
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// String interpolation resolved by the deployment tool
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// A single resource descriptor: type, properties, explicit ordering edges.
#[derive(Debug, Clone)]
pub struct Resource {
    resource_type: String,
    properties: Value,
    depends_on: Vec<String>,
}

impl Resource {
    pub fn new(resource_type: &str, properties: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
        }
    }

    /// Add an explicit ordering edge on top of the implicit reference graph
    pub fn depends_on(mut self, logical_id: &str) -> Self {
        self.depends_on.push(logical_id.to_string());
        self
    }

    fn render(&self) -> Value {
        let mut body = Map::new();
        body.insert("Type".to_string(), json!(self.resource_type));
        body.insert("Properties".to_string(), self.properties.clone());
        if !self.depends_on.is_empty() {
            body.insert("DependsOn".to_string(), json!(self.depends_on));
        }
        Value::Object(body)
    }
}

/// The deployment template under assembly. Descriptors are produced once at
/// synthesis time and never mutated afterwards.
pub struct Template {
    description: String,
    resources: Vec<(String, Resource)>,
    parameters: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            resources: Vec::new(),
            parameters: Map::new(),
            outputs: Map::new(),
        }
    }

    /// Add a resource descriptor under a logical id. Duplicate ids are a
    /// synthesis error.
    pub fn add(&mut self, logical_id: &str, resource: Resource) -> Result<()> {
        if self.has(logical_id) {
            return Err(SynthError::Template {
                message: format!("duplicate logical id: {}", logical_id),
            });
        }
        self.resources.push((logical_id.to_string(), resource));
        Ok(())
    }

    pub fn has(&self, logical_id: &str) -> bool {
        self.resources.iter().any(|(id, _)| id == logical_id)
    }

    pub fn logical_ids(&self) -> Vec<&str> {
        self.resources.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Declare a deploy-time parameter
    pub fn add_parameter(&mut self, name: &str, definition: Value) {
        self.parameters.insert(name.to_string(), definition);
    }

    /// Export a value under the Outputs section
    pub fn add_output(&mut self, name: &str, value: Value, description: &str) {
        self.outputs.insert(
            name.to_string(),
            json!({ "Value": value, "Description": description }),
        );
    }

    /// Render the complete template document
    pub fn render(&self) -> Value {
        let mut resources = Map::new();
        for (id, resource) in &self.resources {
            resources.insert(id.clone(), resource.render());
        }

        let mut doc = Map::new();
        doc.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!("2010-09-09"),
        );
        doc.insert("Description".to_string(), json!(self.description));
        doc.insert(
            "Metadata".to_string(),
            json!({
                "Synthesizer": {
                    "Name": env!("CARGO_PKG_NAME"),
                    "Version": env!("CARGO_PKG_VERSION"),
                    "SynthesizedAt": Utc::now().to_rfc3339(),
                }
            }),
        );
        if !self.parameters.is_empty() {
            doc.insert("Parameters".to_string(), Value::Object(self.parameters.clone()));
        }
        doc.insert("Resources".to_string(), Value::Object(resources));
        if !self.outputs.is_empty() {
            doc.insert("Outputs".to_string(), Value::Object(self.outputs.clone()));
        }
        Value::Object(doc)
    }

    /// Write the rendered artifact to `<out_dir>/<stage>.template.json` and
    /// log its digest.
    pub fn write(&self, out_dir: &Path, stage: &str) -> Result<PathBuf> {
        fs::create_dir_all(out_dir)?;
        let artifact = out_dir.join(format!("{}.template.json", stage));

        let bytes = serde_json::to_vec_pretty(&self.render())?;
        let digest = hex::encode(Sha256::digest(&bytes));
        fs::write(&artifact, &bytes)?;

        info!(
            artifact = %artifact.display(),
            sha256 = %digest,
            resources = self.resources.len(),
            "template artifact written"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_logical_id_is_rejected() {
        let mut template = Template::new("test");
        template
            .add("SiteBucket", Resource::new("AWS::S3::Bucket", json!({})))
            .unwrap();
        let err = template
            .add("SiteBucket", Resource::new("AWS::S3::Bucket", json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate logical id"));
    }

    #[test]
    fn test_depends_on_is_rendered() {
        let mut template = Template::new("test");
        template
            .add(
                "RecordSet",
                Resource::new("AWS::Route53::RecordSet", json!({})).depends_on("Distribution"),
            )
            .unwrap();
        let doc = template.render();
        assert_eq!(
            doc["Resources"]["RecordSet"]["DependsOn"],
            json!(["Distribution"])
        );
    }

    #[test]
    fn test_reference_helpers_shape() {
        assert_eq!(ref_to("SiteBucket"), json!({ "Ref": "SiteBucket" }));
        assert_eq!(
            get_att("SiteBucket", "Arn"),
            json!({ "Fn::GetAtt": ["SiteBucket", "Arn"] })
        );
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let template = Template::new("test");
        let doc = template.render();
        assert!(doc.get("Parameters").is_none());
        assert!(doc.get("Outputs").is_none());
    }
}
