use serde_json::json;

use super::{StackSynthesizer, USER_POOL, USER_POOL_CLIENT, USER_POOL_DOMAIN};
use crate::config::StageConfig;
use crate::error::Result;
use crate::naming::Namer;
use crate::template::{ref_to, Resource, Template};

/// Managed authentication: the user directory, the client the site
/// authenticates through, and the custom `auth.` domain fronting the
/// hosted sign-in pages.
pub struct AuthStack;

impl StackSynthesizer for AuthStack {
    fn id(&self) -> &'static str {
        "auth"
    }

    fn synthesize(
        &self,
        config: &StageConfig,
        namer: &Namer,
        template: &mut Template,
    ) -> Result<()> {
        template.add(
            USER_POOL,
            Resource::new(
                "AWS::Cognito::UserPool",
                json!({
                    "UserPoolName": namer.name("users"),
                    "UsernameAttributes": ["email"],
                    "AutoVerifiedAttributes": ["email"],
                    "Policies": {
                        "PasswordPolicy": {
                            "MinimumLength": 12,
                            "RequireLowercase": true,
                            "RequireUppercase": true,
                            "RequireNumbers": true,
                            "RequireSymbols": false
                        }
                    },
                    "AccountRecoverySetting": {
                        "RecoveryMechanisms": [
                            { "Name": "verified_email", "Priority": 1 }
                        ]
                    }
                }),
            ),
        )?;

        template.add(
            USER_POOL_CLIENT,
            Resource::new(
                "AWS::Cognito::UserPoolClient",
                json!({
                    "ClientName": namer.name("web-client"),
                    "UserPoolId": ref_to(USER_POOL),
                    "GenerateSecret": false,
                    "AllowedOAuthFlows": ["code"],
                    "AllowedOAuthFlowsUserPoolClient": true,
                    "AllowedOAuthScopes": ["openid", "email", "profile"],
                    "SupportedIdentityProviders": ["COGNITO"],
                    "CallbackURLs": config.callback_urls,
                    "LogoutURLs": config.logout_urls,
                    "PreventUserExistenceErrors": "ENABLED"
                }),
            ),
        )?;

        // Custom domain certs for managed auth must live in us-east-1, same as
        // the distribution's.
        template.add(
            USER_POOL_DOMAIN,
            Resource::new(
                "AWS::Cognito::UserPoolDomain",
                json!({
                    "Domain": config.auth_domain(),
                    "UserPoolId": ref_to(USER_POOL),
                    "CustomDomainConfig": {
                        "CertificateArn": config.edge_certificate_arn
                    }
                }),
            ),
        )?;

        template.add_output(
            "UserPoolId",
            ref_to(USER_POOL),
            "Identifier of the user directory",
        );
        template.add_output(
            "UserPoolClientId",
            ref_to(USER_POOL_CLIENT),
            "Client id the site signs in with",
        );
        template.add_output(
            "AuthDomain",
            json!(config.auth_domain()),
            "Custom domain serving the hosted sign-in pages",
        );
        Ok(())
    }
}
