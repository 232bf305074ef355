//! Alarms, escalation wiring, and dashboard generation from a metric catalog.
//!
//! The dashboard body is generated rather than hand-written: each catalog
//! entry becomes one widget, grouped into rows per phase. Identifiers only
//! known at deploy time are left as `${...}` placeholders resolved by the
//! deployment tool.

use serde_json::{json, Value};

use super::{StackSynthesizer, ALERT_TOPIC, API_LOG_GROUP, DISTRIBUTION, HTTP_API, USER_POOL};
use crate::config::StageConfig;
use crate::error::Result;
use crate::naming::Namer;
use crate::template::{ref_to, Resource, Template};

/// How a metric is summarized on its widget
#[derive(Debug, Clone, PartialEq)]
pub enum Stat {
    Sum,
    Average,
    P99,
}

impl Stat {
    fn label(&self) -> &'static str {
        match self {
            Stat::Sum => "Sum",
            Stat::Average => "Average",
            Stat::P99 => "p99",
        }
    }
}

/// One entry of the metric catalog
#[derive(Debug, Clone)]
pub struct MetricDef {
    pub namespace: String,
    pub name: String,
    pub dimensions: Vec<(String, String)>,
    pub stat: Stat,
    pub title: String,
    pub phase: String,
}

/// Generates the dashboard body from the metric catalog
pub struct DashboardBuilder {
    title: String,
    metrics: Vec<MetricDef>,
}

impl DashboardBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            metrics: Vec::new(),
        }
    }

    pub fn add_metric(mut self, metric: MetricDef) -> Self {
        self.metrics.push(metric);
        self
    }

    /// The full catalog for a stage: delivery, backend, and sign-in phases
    pub fn from_catalog(namer: &Namer) -> Self {
        let distribution_dims = vec![
            ("DistributionId".to_string(), format!("${{{}}}", DISTRIBUTION)),
            ("Region".to_string(), "Global".to_string()),
        ];
        let function_dims = vec![("FunctionName".to_string(), namer.name("api"))];
        let api_dims = vec![("ApiId".to_string(), format!("${{{}}}", HTTP_API))];
        let pool_dims = vec![
            ("UserPool".to_string(), format!("${{{}}}", USER_POOL)),
            ("UserPoolClient".to_string(), "(all)".to_string()),
        ];

        let mut builder = Self::new(namer.comment("dashboard"));

        // Delivery metrics
        builder = builder
            .add_metric(MetricDef {
                namespace: "AWS/CloudFront".to_string(),
                name: "Requests".to_string(),
                dimensions: distribution_dims.clone(),
                stat: Stat::Sum,
                title: "Edge requests".to_string(),
                phase: "cdn".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/CloudFront".to_string(),
                name: "BytesDownloaded".to_string(),
                dimensions: distribution_dims.clone(),
                stat: Stat::Sum,
                title: "Bytes served".to_string(),
                phase: "cdn".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/CloudFront".to_string(),
                name: "4xxErrorRate".to_string(),
                dimensions: distribution_dims.clone(),
                stat: Stat::Average,
                title: "Client error rate".to_string(),
                phase: "cdn".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/CloudFront".to_string(),
                name: "5xxErrorRate".to_string(),
                dimensions: distribution_dims,
                stat: Stat::Average,
                title: "Origin error rate".to_string(),
                phase: "cdn".to_string(),
            });

        // Backend metrics
        builder = builder
            .add_metric(MetricDef {
                namespace: "AWS/Lambda".to_string(),
                name: "Invocations".to_string(),
                dimensions: function_dims.clone(),
                stat: Stat::Sum,
                title: "API invocations".to_string(),
                phase: "api".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/Lambda".to_string(),
                name: "Errors".to_string(),
                dimensions: function_dims.clone(),
                stat: Stat::Sum,
                title: "API function errors".to_string(),
                phase: "api".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/Lambda".to_string(),
                name: "Duration".to_string(),
                dimensions: function_dims,
                stat: Stat::P99,
                title: "API function duration".to_string(),
                phase: "api".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/ApiGateway".to_string(),
                name: "Latency".to_string(),
                dimensions: api_dims,
                stat: Stat::P99,
                title: "Gateway latency".to_string(),
                phase: "api".to_string(),
            });

        // Sign-in metrics
        builder = builder
            .add_metric(MetricDef {
                namespace: "AWS/Cognito".to_string(),
                name: "SignInSuccesses".to_string(),
                dimensions: pool_dims.clone(),
                stat: Stat::Sum,
                title: "Successful sign-ins".to_string(),
                phase: "auth".to_string(),
            })
            .add_metric(MetricDef {
                namespace: "AWS/Cognito".to_string(),
                name: "TokenRefreshSuccesses".to_string(),
                dimensions: pool_dims,
                stat: Stat::Sum,
                title: "Token refreshes".to_string(),
                phase: "auth".to_string(),
            });

        builder
    }

    fn metric_widget(&self, metric: &MetricDef, x: u32, y: u32) -> Value {
        let mut series: Vec<Value> = vec![json!(metric.namespace), json!(metric.name)];
        for (dim, value) in &metric.dimensions {
            series.push(json!(dim));
            series.push(json!(value));
        }
        json!({
            "type": "metric",
            "x": x,
            "y": y,
            "width": 12,
            "height": 6,
            "properties": {
                "title": metric.title,
                "metrics": [series],
                "stat": metric.stat.label(),
                "period": 300,
                "view": "timeSeries",
                "region": "${AWS::Region}"
            }
        })
    }

    /// Build the complete dashboard body
    pub fn build(&self) -> Value {
        let mut widgets = Vec::new();
        let mut current_y = 0;

        // Phases in catalog order, deduplicated
        let mut phases: Vec<&str> = Vec::new();
        for metric in &self.metrics {
            if !phases.contains(&metric.phase.as_str()) {
                phases.push(&metric.phase);
            }
        }

        for phase in phases {
            widgets.push(json!({
                "type": "text",
                "x": 0,
                "y": current_y,
                "width": 24,
                "height": 1,
                "properties": { "markdown": format!("## {}", phase.to_uppercase()) }
            }));
            current_y += 1;

            let mut x_offset = 0;
            for metric in self.metrics.iter().filter(|m| m.phase == phase) {
                widgets.push(self.metric_widget(metric, x_offset, current_y));
                x_offset += 12;
                if x_offset >= 24 {
                    x_offset = 0;
                    current_y += 6;
                }
            }
            if x_offset > 0 {
                current_y += 6;
            }
        }

        json!({ "widgets": widgets })
    }
}

/// Escalation topic, alarms, and the generated dashboard.
pub struct ObservabilityStack;

impl StackSynthesizer for ObservabilityStack {
    fn id(&self) -> &'static str {
        "observability"
    }

    fn synthesize(
        &self,
        config: &StageConfig,
        namer: &Namer,
        template: &mut Template,
    ) -> Result<()> {
        template.add(
            ALERT_TOPIC,
            Resource::new(
                "AWS::SNS::Topic",
                json!({ "TopicName": namer.name("alerts") }),
            ),
        )?;

        template.add(
            "AlertSubscription",
            Resource::new(
                "AWS::SNS::Subscription",
                json!({
                    "TopicArn": ref_to(ALERT_TOPIC),
                    "Protocol": "email",
                    "Endpoint": config.escalation_email
                }),
            ),
        )?;

        template.add(
            "Cdn5xxAlarm",
            Resource::new(
                "AWS::CloudWatch::Alarm",
                json!({
                    "AlarmName": namer.name("cdn-5xx"),
                    "AlarmDescription": "Origin error rate at the edge is elevated",
                    "Namespace": "AWS/CloudFront",
                    "MetricName": "5xxErrorRate",
                    "Dimensions": [
                        { "Name": "DistributionId", "Value": ref_to(DISTRIBUTION) },
                        { "Name": "Region", "Value": "Global" }
                    ],
                    "Statistic": "Average",
                    "Period": 300,
                    "EvaluationPeriods": 3,
                    "Threshold": 5,
                    "ComparisonOperator": "GreaterThanThreshold",
                    "TreatMissingData": "notBreaching",
                    "AlarmActions": [ref_to(ALERT_TOPIC)]
                }),
            ),
        )?;

        template.add(
            "ApiFunctionErrorsAlarm",
            Resource::new(
                "AWS::CloudWatch::Alarm",
                json!({
                    "AlarmName": namer.name("api-errors"),
                    "AlarmDescription": "API function is returning errors",
                    "Namespace": "AWS/Lambda",
                    "MetricName": "Errors",
                    "Dimensions": [
                        { "Name": "FunctionName", "Value": namer.name("api") }
                    ],
                    "Statistic": "Sum",
                    "Period": 300,
                    "EvaluationPeriods": 1,
                    "Threshold": 1,
                    "ComparisonOperator": "GreaterThanOrEqualToThreshold",
                    "TreatMissingData": "notBreaching",
                    "AlarmActions": [ref_to(ALERT_TOPIC)]
                }),
            ),
        )?;

        template.add(
            "GatewayLatencyAlarm",
            Resource::new(
                "AWS::CloudWatch::Alarm",
                json!({
                    "AlarmName": namer.name("gateway-latency"),
                    "AlarmDescription": "Gateway p99 latency is above two seconds",
                    "Namespace": "AWS/ApiGateway",
                    "MetricName": "Latency",
                    "Dimensions": [
                        { "Name": "ApiId", "Value": ref_to(HTTP_API) }
                    ],
                    "ExtendedStatistic": "p99",
                    "Period": 300,
                    "EvaluationPeriods": 3,
                    "Threshold": 2000,
                    "ComparisonOperator": "GreaterThanThreshold",
                    "TreatMissingData": "notBreaching",
                    "AlarmActions": [ref_to(ALERT_TOPIC)]
                }),
            ),
        )?;

        // Logged errors surface as a metric even when the invocation succeeds
        template.add(
            "ApiLoggedErrorsFilter",
            Resource::new(
                "AWS::Logs::MetricFilter",
                json!({
                    "LogGroupName": ref_to(API_LOG_GROUP),
                    "FilterPattern": "?ERROR ?error",
                    "MetricTransformations": [{
                        "MetricNamespace": format!("fortunasbet/{}", namer.stage()),
                        "MetricName": "ApiLoggedErrors",
                        "MetricValue": "1",
                        "DefaultValue": 0
                    }]
                }),
            ),
        )?;

        // Deploy-time identifiers inside the body resolve through Fn::Sub
        let body = serde_json::to_string(&DashboardBuilder::from_catalog(namer).build())?;
        template.add(
            "Dashboard",
            Resource::new(
                "AWS::CloudWatch::Dashboard",
                json!({
                    "DashboardName": namer.name("dashboard"),
                    "DashboardBody": { "Fn::Sub": body }
                }),
            ),
        )?;

        template.add_output(
            "AlertTopicArn",
            ref_to(ALERT_TOPIC),
            "Topic alarm notifications are published to",
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_all_phases() {
        let builder = DashboardBuilder::from_catalog(&Namer::new("testing"));
        let body = builder.build();
        let widgets = body["widgets"].as_array().unwrap();

        let headers: Vec<&str> = widgets
            .iter()
            .filter(|w| w["type"] == "text")
            .map(|w| w["properties"]["markdown"].as_str().unwrap())
            .collect();
        assert_eq!(headers, vec!["## CDN", "## API", "## AUTH"]);
    }

    #[test]
    fn test_widgets_stay_inside_the_grid() {
        let builder = DashboardBuilder::from_catalog(&Namer::new("testing"));
        let body = builder.build();
        for widget in body["widgets"].as_array().unwrap() {
            let x = widget["x"].as_u64().unwrap();
            let width = widget["width"].as_u64().unwrap();
            assert!(x + width <= 24, "widget overflows the 24-column grid");
        }
    }

    #[test]
    fn test_latency_widgets_use_p99() {
        let builder = DashboardBuilder::from_catalog(&Namer::new("testing"));
        let body = builder.build();
        let latency = body["widgets"]
            .as_array()
            .unwrap()
            .iter()
            .find(|w| w["properties"]["title"] == "Gateway latency")
            .unwrap();
        assert_eq!(latency["properties"]["stat"], "p99");
    }
}
