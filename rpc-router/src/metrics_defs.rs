use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "requests.total",
    metric_type: MetricType::Counter,
    description: "Requests handled on the RPC endpoint. Tagged with method, status.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with method, status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const UPSTREAM_CALLS: MetricDef = MetricDef {
    name: "upstream.calls",
    metric_type: MetricType::Counter,
    description: "Upstream calls made. Tagged with upstream, result (success or the failure kind).",
};

pub const UPSTREAM_CALL_DURATION: MetricDef = MetricDef {
    name: "upstream.call.duration",
    metric_type: MetricType::Histogram,
    description: "Upstream call duration in seconds, excluding time waiting for a permit. Tagged with upstream.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS,
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    UPSTREAM_CALLS,
    UPSTREAM_CALL_DURATION,
];
