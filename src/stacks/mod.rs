//! Stack synthesizers. Each contributes one slice of the resource graph to the
//! shared template; the ordering below mirrors the dependency direction
//! (storage → auth → api → cdn → dns → observability).

use tracing::info;

use crate::config::StageConfig;
use crate::error::Result;
use crate::naming::Namer;
use crate::template::Template;

pub mod api;
pub mod auth;
pub mod cdn;
pub mod dns;
pub mod observability;
pub mod storage;

// Logical ids wired between stacks
pub(crate) const SITE_BUCKET: &str = "SiteBucket";
pub(crate) const SITE_BUCKET_POLICY: &str = "SiteBucketPolicy";
pub(crate) const ORIGIN_ACCESS_CONTROL: &str = "SiteOriginAccessControl";
pub(crate) const SPA_REWRITE_FUNCTION: &str = "SpaRewriteFunction";
pub(crate) const DISTRIBUTION: &str = "SiteDistribution";
pub(crate) const USER_POOL: &str = "UserPool";
pub(crate) const USER_POOL_CLIENT: &str = "UserPoolClient";
pub(crate) const USER_POOL_DOMAIN: &str = "UserPoolDomain";
pub(crate) const DATA_TABLE: &str = "DataTable";
pub(crate) const API_ROLE: &str = "ApiFunctionRole";
pub(crate) const API_FUNCTION: &str = "ApiFunction";
pub(crate) const HTTP_API: &str = "HttpApi";
pub(crate) const API_AUTHORIZER: &str = "HttpApiAuthorizer";
pub(crate) const API_INTEGRATION: &str = "HttpApiIntegration";
pub(crate) const API_ROUTE: &str = "HttpApiRoute";
pub(crate) const API_STAGE: &str = "HttpApiStage";
pub(crate) const API_PERMISSION: &str = "HttpApiInvokePermission";
pub(crate) const API_DOMAIN: &str = "HttpApiDomain";
pub(crate) const API_LOG_GROUP: &str = "ApiFunctionLogGroup";
pub(crate) const API_MAPPING: &str = "HttpApiMapping";
pub(crate) const ALERT_TOPIC: &str = "AlertTopic";

/// One slice of the resource graph. Implementations are stateless; everything
/// they need arrives through the stage configuration and the namer.
pub trait StackSynthesizer {
    fn id(&self) -> &'static str;

    fn synthesize(
        &self,
        config: &StageConfig,
        namer: &Namer,
        template: &mut Template,
    ) -> Result<()>;
}

/// The stacks in synthesis order
pub fn default_stacks() -> Vec<Box<dyn StackSynthesizer>> {
    vec![
        Box::new(storage::StorageStack),
        Box::new(auth::AuthStack),
        Box::new(api::ApiStack),
        Box::new(cdn::CdnStack),
        Box::new(dns::DnsStack),
        Box::new(observability::ObservabilityStack),
    ]
}

/// Run every stack against a fresh template for the given stage.
pub fn synthesize(config: &StageConfig) -> Result<Template> {
    let namer = Namer::new(&config.stage);
    let mut template = Template::new(format!(
        "fortunasbet.com resources for stage {} ({})",
        config.stage, config.domain_name
    ));

    for stack in default_stacks() {
        let before = template.logical_ids().len();
        stack.synthesize(config, &namer, &mut template)?;
        info!(
            stack = stack.id(),
            resources = template.logical_ids().len() - before,
            "stack synthesized"
        );
    }
    Ok(template)
}
