use serde_json::{json, Value};

use super::{StackSynthesizer, API_DOMAIN, DISTRIBUTION, USER_POOL_DOMAIN};
use crate::config::StageConfig;
use crate::constants::CLOUDFRONT_HOSTED_ZONE_ID;
use crate::error::Result;
use crate::naming::{parent_domain, Namer};
use crate::template::{get_att, Resource, Template};

/// Records published into the stage's hosted zone: the site aliases, the auth
/// domain, and the api domain. Eventual consistency of propagation is the
/// control plane's concern.
pub struct DnsStack;

impl DnsStack {
    fn alias_record(name: &str, record_type: &str, target: Value, zone_target: Value, zone_id: &str) -> Resource {
        Resource::new(
            "AWS::Route53::RecordSet",
            json!({
                "Name": name,
                "Type": record_type,
                "HostedZoneId": zone_id,
                "AliasTarget": {
                    "DNSName": target,
                    "HostedZoneId": zone_target
                }
            }),
        )
    }
}

impl StackSynthesizer for DnsStack {
    fn id(&self) -> &'static str {
        "dns"
    }

    fn synthesize(
        &self,
        config: &StageConfig,
        _namer: &Namer,
        template: &mut Template,
    ) -> Result<()> {
        let zone_id = &config.hosted_zone_id;
        let distribution_target = get_att(DISTRIBUTION, "DomainName");

        for (logical_id, record_type) in [("SiteAliasA", "A"), ("SiteAliasAAAA", "AAAA")] {
            template.add(
                logical_id,
                Self::alias_record(
                    &config.domain_name,
                    record_type,
                    distribution_target.clone(),
                    json!(CLOUDFRONT_HOSTED_ZONE_ID),
                    zone_id,
                ),
            )?;
        }

        // Apex stages also publish the www alias the distribution answers on
        if parent_domain(&config.domain_name) == config.domain_name {
            for (logical_id, record_type) in [("WwwAliasA", "A"), ("WwwAliasAAAA", "AAAA")] {
                template.add(
                    logical_id,
                    Self::alias_record(
                        &format!("www.{}", config.domain_name),
                        record_type,
                        distribution_target.clone(),
                        json!(CLOUDFRONT_HOSTED_ZONE_ID),
                        zone_id,
                    ),
                )?;
            }
        }

        // The managed auth domain is itself fronted by a distribution
        template.add(
            "AuthAliasA",
            Self::alias_record(
                &config.auth_domain(),
                "A",
                get_att(USER_POOL_DOMAIN, "CloudFrontDistribution"),
                json!(CLOUDFRONT_HOSTED_ZONE_ID),
                zone_id,
            )
            .depends_on(USER_POOL_DOMAIN),
        )?;

        template.add(
            "ApiAliasA",
            Self::alias_record(
                &format!("api.{}", config.domain_name),
                "A",
                get_att(API_DOMAIN, "RegionalDomainName"),
                get_att(API_DOMAIN, "RegionalHostedZoneId"),
                zone_id,
            ),
        )?;

        template.add_output(
            "HostedZoneApex",
            json!(parent_domain(&config.domain_name)),
            "Zone apex the stage records are published under",
        );
        Ok(())
    }
}
