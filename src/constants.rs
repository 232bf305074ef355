/// Naming and provider constants shared across the stack synthesizers.
/// Resource names are always `{RESOURCE_PREFIX}-{stage}-{kind}`; the prefix
/// never changes between stages.

// Fixed naming prefix for every provisioned resource
pub const RESOURCE_PREFIX: &str = "fortunasbet";

// Stage labels selecting a configuration variant
pub const TESTING_STAGE: &str = "testing";
pub const PRODUCTION_STAGE: &str = "production";

// Hosted zone id CloudFront aliases resolve against (fixed by the provider)
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

// Managed "CachingOptimized" cache policy id
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// Get all supported stage labels
pub fn supported_stages() -> Vec<&'static str> {
    vec![TESTING_STAGE, PRODUCTION_STAGE]
}

/// Whether a stage label is one of the known deployment environments
pub fn is_known_stage(stage: &str) -> bool {
    supported_stages().contains(&stage)
}
