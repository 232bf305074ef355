use serde_json::json;

use super::{
    StackSynthesizer, API_AUTHORIZER, API_DOMAIN, API_FUNCTION, API_INTEGRATION, API_LOG_GROUP,
    API_MAPPING, API_PERMISSION, API_ROLE, API_ROUTE, API_STAGE, DATA_TABLE, HTTP_API, USER_POOL,
    USER_POOL_CLIENT,
};
use crate::config::StageConfig;
use crate::error::Result;
use crate::naming::Namer;
use crate::template::{get_att, ref_to, sub, Resource, Template};

/// The serverless backend: one table, one compute function behind an HTTP API,
/// with token validation delegated to the user pool's JWT issuer.
pub struct ApiStack;

impl StackSynthesizer for ApiStack {
    fn id(&self) -> &'static str {
        "api"
    }

    fn synthesize(
        &self,
        config: &StageConfig,
        namer: &Namer,
        template: &mut Template,
    ) -> Result<()> {
        template.add(
            DATA_TABLE,
            Resource::new(
                "AWS::DynamoDB::Table",
                json!({
                    "TableName": namer.name("data"),
                    "BillingMode": "PAY_PER_REQUEST",
                    "AttributeDefinitions": [
                        { "AttributeName": "pk", "AttributeType": "S" },
                        { "AttributeName": "sk", "AttributeType": "S" }
                    ],
                    "KeySchema": [
                        { "AttributeName": "pk", "KeyType": "HASH" },
                        { "AttributeName": "sk", "KeyType": "RANGE" }
                    ],
                    "PointInTimeRecoverySpecification": {
                        "PointInTimeRecoveryEnabled": true
                    }
                }),
            ),
        )?;

        template.add(
            API_ROLE,
            Resource::new(
                "AWS::IAM::Role",
                json!({
                    "RoleName": namer.name("api-role"),
                    "AssumeRolePolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": { "Service": "lambda.amazonaws.com" },
                            "Action": "sts:AssumeRole"
                        }]
                    },
                    "Policies": [
                        {
                            "PolicyName": "logs",
                            "PolicyDocument": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Action": [
                                        "logs:CreateLogGroup",
                                        "logs:CreateLogStream",
                                        "logs:PutLogEvents"
                                    ],
                                    "Resource": "arn:aws:logs:*:*:*"
                                }]
                            }
                        },
                        {
                            "PolicyName": "table-access",
                            "PolicyDocument": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Action": [
                                        "dynamodb:GetItem",
                                        "dynamodb:PutItem",
                                        "dynamodb:UpdateItem",
                                        "dynamodb:DeleteItem",
                                        "dynamodb:Query"
                                    ],
                                    "Resource": [
                                        get_att(DATA_TABLE, "Arn"),
                                        { "Fn::Join": ["/", [get_att(DATA_TABLE, "Arn"), "index/*"]] }
                                    ]
                                }]
                            }
                        }
                    ]
                }),
            ),
        )?;

        // Function code is uploaded out of band; the object key arrives as a
        // deploy-time parameter.
        template.add_parameter(
            "ApiCodeKey",
            json!({
                "Type": "String",
                "Description": "Object key of the function bundle inside the artifacts bucket"
            }),
        );

        template.add(
            API_FUNCTION,
            Resource::new(
                "AWS::Lambda::Function",
                json!({
                    "FunctionName": namer.name("api"),
                    "Runtime": "nodejs18.x",
                    "Handler": "index.handler",
                    "MemorySize": 256,
                    "Timeout": 15,
                    "Role": get_att(API_ROLE, "Arn"),
                    "Code": {
                        "S3Bucket": namer.name("artifacts"),
                        "S3Key": ref_to("ApiCodeKey")
                    },
                    "Environment": {
                        "Variables": {
                            "TABLE_NAME": ref_to(DATA_TABLE),
                            "USER_POOL_ID": ref_to(USER_POOL),
                            "USER_POOL_CLIENT_ID": ref_to(USER_POOL_CLIENT),
                            "STAGE": namer.stage()
                        }
                    }
                }),
            ),
        )?;

        // Pre-created so the retention setting applies from the first invocation
        template.add(
            API_LOG_GROUP,
            Resource::new(
                "AWS::Logs::LogGroup",
                json!({
                    "LogGroupName": format!("/aws/lambda/{}", namer.name("api")),
                    "RetentionInDays": 30
                }),
            ),
        )?;

        template.add(
            HTTP_API,
            Resource::new(
                "AWS::ApiGatewayV2::Api",
                json!({
                    "Name": namer.name("http-api"),
                    "ProtocolType": "HTTP",
                    "CorsConfiguration": {
                        "AllowOrigins": config.allowed_origins(),
                        "AllowMethods": ["GET", "POST", "PUT", "DELETE", "OPTIONS"],
                        "AllowHeaders": ["authorization", "content-type"],
                        "MaxAge": 600
                    }
                }),
            ),
        )?;

        template.add(
            API_AUTHORIZER,
            Resource::new(
                "AWS::ApiGatewayV2::Authorizer",
                json!({
                    "Name": namer.name("jwt-authorizer"),
                    "ApiId": ref_to(HTTP_API),
                    "AuthorizerType": "JWT",
                    "IdentitySource": ["$request.header.Authorization"],
                    "JwtConfiguration": {
                        "Audience": [ref_to(USER_POOL_CLIENT)],
                        "Issuer": {
                            "Fn::Sub": format!(
                                "https://cognito-idp.${{AWS::Region}}.amazonaws.com/${{{}}}",
                                USER_POOL
                            )
                        }
                    }
                }),
            ),
        )?;

        template.add(
            API_INTEGRATION,
            Resource::new(
                "AWS::ApiGatewayV2::Integration",
                json!({
                    "ApiId": ref_to(HTTP_API),
                    "IntegrationType": "AWS_PROXY",
                    "IntegrationUri": get_att(API_FUNCTION, "Arn"),
                    "PayloadFormatVersion": "2.0"
                }),
            ),
        )?;

        template.add(
            API_ROUTE,
            Resource::new(
                "AWS::ApiGatewayV2::Route",
                json!({
                    "ApiId": ref_to(HTTP_API),
                    "RouteKey": "ANY /{proxy+}",
                    "AuthorizationType": "JWT",
                    "AuthorizerId": ref_to(API_AUTHORIZER),
                    "Target": {
                        "Fn::Join": ["/", ["integrations", ref_to(API_INTEGRATION)]]
                    }
                }),
            ),
        )?;

        template.add(
            API_STAGE,
            Resource::new(
                "AWS::ApiGatewayV2::Stage",
                json!({
                    "ApiId": ref_to(HTTP_API),
                    "StageName": "$default",
                    "AutoDeploy": true
                }),
            ),
        )?;

        template.add(
            API_PERMISSION,
            Resource::new(
                "AWS::Lambda::Permission",
                json!({
                    "FunctionName": ref_to(API_FUNCTION),
                    "Action": "lambda:InvokeFunction",
                    "Principal": "apigateway.amazonaws.com",
                    "SourceArn": sub(&format!(
                        "arn:aws:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/*/*",
                        HTTP_API
                    ))
                }),
            ),
        )?;

        // Stable api.{domain} endpoint in front of the generated invoke URL
        template.add(
            API_DOMAIN,
            Resource::new(
                "AWS::ApiGatewayV2::DomainName",
                json!({
                    "DomainName": format!("api.{}", config.domain_name),
                    "DomainNameConfigurations": [{
                        "CertificateArn": config.certificate_arn,
                        "EndpointType": "REGIONAL",
                        "SecurityPolicy": "TLS_1_2"
                    }]
                }),
            ),
        )?;

        template.add(
            API_MAPPING,
            Resource::new(
                "AWS::ApiGatewayV2::ApiMapping",
                json!({
                    "ApiId": ref_to(HTTP_API),
                    "DomainName": ref_to(API_DOMAIN),
                    "Stage": ref_to(API_STAGE)
                }),
            ),
        )?;

        template.add_output(
            "HttpApiEndpoint",
            get_att(HTTP_API, "ApiEndpoint"),
            "Invoke URL of the HTTP API",
        );
        template.add_output(
            "DataTableName",
            ref_to(DATA_TABLE),
            "Name of the backing table",
        );
        Ok(())
    }
}
