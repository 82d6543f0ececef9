//! End-to-end checks through `tracing-opentelemetry` and the OpenTelemetry SDK.

use std::sync::Arc;

use async_trait::async_trait;
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::{SpanKind, Status, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use sea_orm::DbErr;
use sea_orm_otel::{
    ConnectError, Connector, ConnectorExt, SpanOptions, TracedConnector, TracingConfig,
    WrapConnection,
};
use tracing::Instrument;
use tracing_subscriber::layer::SubscriberExt;

struct Telemetry {
    spans: InMemorySpanExporter,
    metrics: InMemoryMetricExporter,
    meter_provider: SdkMeterProvider,
    _tracer_provider: SdkTracerProvider,
    _guard: tracing::subscriber::DefaultGuard,
}

impl Telemetry {
    fn install() -> Self {
        let spans = InMemorySpanExporter::default();
        let tracer_provider = SdkTracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("test")));
        let guard = tracing::subscriber::set_default(subscriber);

        let metrics = InMemoryMetricExporter::default();
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(metrics.clone()).build())
            .build();

        Self {
            spans,
            metrics,
            meter_provider,
            _tracer_provider: tracer_provider,
            _guard: guard,
        }
    }

    fn config(&self, options: SpanOptions) -> TracingConfig {
        TracingConfig::default()
            .with_meter(self.meter_provider.meter("test"))
            .with_attribute(KeyValue::new("db.system", "stub"))
            .with_span_options(options)
    }

    fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.get_finished_spans().expect("finished spans")
    }

    fn span(&self, name: &str) -> Option<SpanData> {
        self.finished_spans().into_iter().find(|span| span.name == name)
    }

    /// Attributes and counts of every `db.sql.latency` data point.
    fn latency_points(&self) -> Vec<(Vec<KeyValue>, u64)> {
        self.meter_provider.force_flush().expect("flush metrics");
        let mut points = Vec::new();
        for resource_metrics in self.metrics.get_finished_metrics().expect("finished metrics") {
            for scope in resource_metrics.scope_metrics() {
                for metric in scope.metrics() {
                    if metric.name() != "db.sql.latency" {
                        continue;
                    }
                    let AggregatedMetrics::F64(MetricData::Histogram(histogram)) = metric.data()
                    else {
                        continue;
                    };
                    for point in histogram.data_points() {
                        points.push((point.attributes().cloned().collect(), point.count()));
                    }
                }
            }
        }
        points
    }
}

#[derive(Debug)]
struct Conn;

impl WrapConnection for Conn {
    type Wrapped = Conn;

    fn wrap_connection(self, _config: Arc<TracingConfig>) -> Conn {
        self
    }
}

#[derive(Clone, Copy)]
enum Outcome {
    Connect,
    Refuse,
    Skip,
    Hang,
}

struct StubConnector(Outcome);

#[async_trait]
impl Connector for StubConnector {
    type Connection = Conn;
    type Error = ConnectError;
    type Driver = ();

    async fn connect(&self) -> Result<Conn, ConnectError> {
        match self.0 {
            Outcome::Connect => Ok(Conn),
            Outcome::Refuse => Err(DbErr::Custom("connection refused".into()).into()),
            Outcome::Skip => Err(ConnectError::Skip),
            Outcome::Hang => std::future::pending().await,
        }
    }

    fn driver(&self) -> &() {
        &()
    }
}

fn connector(
    telemetry: &Telemetry,
    outcome: Outcome,
    options: SpanOptions,
) -> TracedConnector<StubConnector> {
    StubConnector(outcome).traced(telemetry.config(options))
}

fn has(attributes: &[KeyValue], key: &'static str, value: &'static str) -> bool {
    attributes.contains(&KeyValue::new(key, value))
}

#[tokio::test]
async fn failed_connect_is_an_error_span_under_the_caller() {
    let telemetry = Telemetry::install();
    let connector = connector(&telemetry, Outcome::Refuse, SpanOptions::default());

    let result = connector
        .connect()
        .instrument(tracing::info_span!("request"))
        .await;
    assert!(matches!(
        result,
        Err(ConnectError::Db(DbErr::Custom(ref msg))) if msg == "connection refused"
    ));

    let span = telemetry.span("sql.connector.connect").expect("connect span");
    let parent = telemetry.span("request").expect("request span");
    assert_eq!(span.span_kind, SpanKind::Client);
    assert!(matches!(span.status, Status::Error { .. }));
    assert_eq!(span.parent_span_id, parent.span_context.span_id());
    assert_eq!(span.span_context.trace_id(), parent.span_context.trace_id());
    assert!(has(&span.attributes, "db.system", "stub"));

    let points = telemetry.latency_points();
    assert_eq!(points.len(), 1);
    let (attributes, count) = &points[0];
    assert_eq!(*count, 1);
    assert!(has(attributes, "method", "sql.connector.connect"));
    assert!(has(attributes, "status", "error"));
    assert!(has(attributes, "db.system", "stub"));
}

#[tokio::test]
async fn successful_connect_leaves_status_unset() {
    let telemetry = Telemetry::install();
    let connector = connector(&telemetry, Outcome::Connect, SpanOptions::default());

    connector
        .connect()
        .instrument(tracing::info_span!("request"))
        .await
        .expect("connect");

    let span = telemetry.span("sql.connector.connect").expect("connect span");
    assert_eq!(span.status, Status::Unset);

    let points = telemetry.latency_points();
    assert_eq!(points.len(), 1);
    assert!(has(&points[0].0, "status", "ok"));
}

#[tokio::test]
async fn retry_signal_follows_disable_err_skip() {
    let telemetry = Telemetry::install();

    connector(&telemetry, Outcome::Skip, SpanOptions::default())
        .connect()
        .instrument(tracing::info_span!("default"))
        .await
        .expect_err("retry signal");
    connector(
        &telemetry,
        Outcome::Skip,
        SpanOptions::default().with_disable_err_skip(true),
    )
    .connect()
    .instrument(tracing::info_span!("strict"))
    .await
    .expect_err("retry signal");

    let spans = telemetry.finished_spans();
    let parent_id = |name: &str| {
        spans
            .iter()
            .find(|span| span.name == name)
            .map(|span| span.span_context.span_id())
            .expect("parent span")
    };
    let child_of = |parent: &str| {
        let id = parent_id(parent);
        spans
            .iter()
            .find(|span| span.name == "sql.connector.connect" && span.parent_span_id == id)
            .expect("connect span")
    };

    assert_eq!(child_of("default").status, Status::Unset);
    assert!(matches!(child_of("strict").status, Status::Error { .. }));

    // Both attempts still count as failed calls.
    let points = telemetry.latency_points();
    let failed: u64 = points
        .iter()
        .filter(|(attributes, _)| has(attributes, "status", "error"))
        .map(|(_, count)| count)
        .sum();
    assert_eq!(failed, 2);
}

#[tokio::test]
async fn no_parent_means_no_span_but_a_measurement() {
    let telemetry = Telemetry::install();
    let connector = connector(&telemetry, Outcome::Connect, SpanOptions::default());

    connector.connect().await.expect("connect");

    assert!(telemetry.finished_spans().is_empty());
    let points = telemetry.latency_points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].1, 1);
}

#[tokio::test]
async fn cancelled_connect_is_measured_as_failed() {
    let telemetry = Telemetry::install();
    let connector = connector(
        &telemetry,
        Outcome::Hang,
        SpanOptions::default().with_allow_root(true),
    );

    tokio::select! {
        biased;
        _ = connector.connect() => panic!("stub connector never completes"),
        _ = std::future::ready(()) => {}
    }

    let span = telemetry.span("sql.connector.connect").expect("connect span");
    assert_eq!(span.parent_span_id, opentelemetry::trace::SpanId::INVALID);

    let points = telemetry.latency_points();
    assert_eq!(points.len(), 1);
    assert!(has(&points[0].0, "status", "error"));
}
