use serde_json::json;

use super::{StackSynthesizer, SITE_BUCKET};
use crate::config::StageConfig;
use crate::error::Result;
use crate::naming::Namer;
use crate::template::{get_att, ref_to, Resource, Template};

/// Private object-storage bucket holding the static site build output. The
/// distribution is the only reader; the grant lives with the cdn stack because
/// it is conditioned on the distribution's identity.
pub struct StorageStack;

impl StackSynthesizer for StorageStack {
    fn id(&self) -> &'static str {
        "storage"
    }

    fn synthesize(
        &self,
        _config: &StageConfig,
        namer: &Namer,
        template: &mut Template,
    ) -> Result<()> {
        template.add(
            SITE_BUCKET,
            Resource::new(
                "AWS::S3::Bucket",
                json!({
                    "BucketName": namer.name("site"),
                    "BucketEncryption": {
                        "ServerSideEncryptionConfiguration": [
                            { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                        ]
                    },
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true
                    },
                    "OwnershipControls": {
                        "Rules": [{ "ObjectOwnership": "BucketOwnerEnforced" }]
                    }
                }),
            ),
        )?;

        template.add_output(
            "SiteBucketName",
            ref_to(SITE_BUCKET),
            "Bucket the site build output is uploaded into",
        );
        template.add_output(
            "SiteBucketArn",
            get_att(SITE_BUCKET, "Arn"),
            "ARN of the site bucket",
        );
        Ok(())
    }
}
