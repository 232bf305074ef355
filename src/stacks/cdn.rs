use serde_json::json;

use super::{
    StackSynthesizer, DISTRIBUTION, ORIGIN_ACCESS_CONTROL, SITE_BUCKET, SITE_BUCKET_POLICY,
    SPA_REWRITE_FUNCTION,
};
use crate::config::StageConfig;
use crate::constants::CACHING_OPTIMIZED_POLICY_ID;
use crate::error::Result;
use crate::naming::{parent_domain, Namer};
use crate::template::{get_att, ref_to, sub, Resource, Template};

/// Edge rewrite for single-page-application routing: any request without a
/// file extension is served the application shell.
const SPA_REWRITE_SCRIPT: &str = r#"function handler(event) {
    var request = event.request;
    if (!request.uri.includes('.')) {
        request.uri = '/index.html';
    }
    return request;
}"#;

/// Content-delivery distribution fronting the site bucket through an origin
/// access control, with the SPA rewrite attached at the viewer request.
pub struct CdnStack;

impl CdnStack {
    /// Aliases served by the distribution. Apex stages also answer on `www.`.
    fn aliases(config: &StageConfig) -> Vec<String> {
        let mut aliases = vec![config.domain_name.clone()];
        if parent_domain(&config.domain_name) == config.domain_name {
            aliases.push(format!("www.{}", config.domain_name));
        }
        aliases
    }
}

impl StackSynthesizer for CdnStack {
    fn id(&self) -> &'static str {
        "cdn"
    }

    fn synthesize(
        &self,
        config: &StageConfig,
        namer: &Namer,
        template: &mut Template,
    ) -> Result<()> {
        template.add(
            ORIGIN_ACCESS_CONTROL,
            Resource::new(
                "AWS::CloudFront::OriginAccessControl",
                json!({
                    "OriginAccessControlConfig": {
                        "Name": namer.name("site-oac"),
                        "OriginAccessControlOriginType": "s3",
                        "SigningBehavior": "always",
                        "SigningProtocol": "sigv4"
                    }
                }),
            ),
        )?;

        template.add(
            SPA_REWRITE_FUNCTION,
            Resource::new(
                "AWS::CloudFront::Function",
                json!({
                    "Name": namer.name("spa-rewrite"),
                    "AutoPublish": true,
                    "FunctionConfig": {
                        "Comment": namer.comment("SPA route rewrite"),
                        "Runtime": "cloudfront-js-1.0"
                    },
                    "FunctionCode": SPA_REWRITE_SCRIPT
                }),
            ),
        )?;

        template.add(
            DISTRIBUTION,
            Resource::new(
                "AWS::CloudFront::Distribution",
                json!({
                    "DistributionConfig": {
                        "Comment": namer.comment("site"),
                        "Enabled": true,
                        "HttpVersion": "http2",
                        "DefaultRootObject": "index.html",
                        "Aliases": Self::aliases(config),
                        "Origins": [{
                            "Id": "site-bucket",
                            "DomainName": get_att(SITE_BUCKET, "RegionalDomainName"),
                            "OriginAccessControlId": ref_to(ORIGIN_ACCESS_CONTROL),
                            "S3OriginConfig": { "OriginAccessIdentity": "" }
                        }],
                        "DefaultCacheBehavior": {
                            "TargetOriginId": "site-bucket",
                            "ViewerProtocolPolicy": "redirect-to-https",
                            "CachePolicyId": CACHING_OPTIMIZED_POLICY_ID,
                            "AllowedMethods": ["GET", "HEAD", "OPTIONS"],
                            "Compress": true,
                            "FunctionAssociations": [{
                                "EventType": "viewer-request",
                                "FunctionARN": get_att(SPA_REWRITE_FUNCTION, "FunctionARN")
                            }]
                        },
                        "CustomErrorResponses": [
                            {
                                "ErrorCode": 403,
                                "ResponseCode": 200,
                                "ResponsePagePath": "/index.html"
                            },
                            {
                                "ErrorCode": 404,
                                "ResponseCode": 200,
                                "ResponsePagePath": "/index.html"
                            }
                        ],
                        "ViewerCertificate": {
                            "AcmCertificateArn": config.edge_certificate_arn,
                            "SslSupportMethod": "sni-only",
                            "MinimumProtocolVersion": "TLSv1.2_2021"
                        }
                    }
                }),
            ),
        )?;

        // Read grant for the distribution, conditioned on its identity so no
        // other principal can present the service principal.
        template.add(
            SITE_BUCKET_POLICY,
            Resource::new(
                "AWS::S3::BucketPolicy",
                json!({
                    "Bucket": ref_to(SITE_BUCKET),
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": { "Service": "cloudfront.amazonaws.com" },
                            "Action": "s3:GetObject",
                            "Resource": {
                                "Fn::Join": ["/", [get_att(SITE_BUCKET, "Arn"), "*"]]
                            },
                            "Condition": {
                                "StringEquals": {
                                    "AWS:SourceArn": sub(&format!(
                                        "arn:aws:cloudfront::${{AWS::AccountId}}:distribution/${{{}}}",
                                        DISTRIBUTION
                                    ))
                                }
                            }
                        }]
                    }
                }),
            ),
        )?;

        template.add_output(
            "DistributionId",
            ref_to(DISTRIBUTION),
            "Identifier of the site distribution",
        );
        template.add_output(
            "DistributionDomainName",
            get_att(DISTRIBUTION, "DomainName"),
            "Generated domain of the distribution",
        );
        Ok(())
    }
}
