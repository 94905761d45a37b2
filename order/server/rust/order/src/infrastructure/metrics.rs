use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// ImportMetrics は一括取込の Prometheus メトリクス。
pub struct ImportMetrics {
    jobs_total: IntCounterVec,
    rows_total: IntCounterVec,
    registry: Registry,
}

impl ImportMetrics {
    /// service_name はメトリクスの service ラベルに使用される。
    pub fn new(service_name: &str) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let jobs_total = IntCounterVec::new(
            Opts::new("order_import_jobs_total", "Total number of import jobs by final status")
                .const_label("service", service_name),
            &["status"],
        )?;
        let rows_total = IntCounterVec::new(
            Opts::new("order_import_rows_total", "Total number of imported rows by outcome")
                .const_label("service", service_name),
            &["outcome"],
        )?;

        registry.register(Box::new(jobs_total.clone()))?;
        registry.register(Box::new(rows_total.clone()))?;

        Ok(Self {
            jobs_total,
            rows_total,
            registry,
        })
    }

    /// status: submitted / completed / failed
    pub fn record_job(&self, status: &str) {
        self.jobs_total.with_label_values(&[status]).inc();
    }

    /// outcome: created / skipped / failed / stamp_failed
    pub fn record_rows(&self, outcome: &str, count: usize) {
        self.rows_total
            .with_label_values(&[outcome])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Prometheus テキストフォーマットでメトリクスを返す。
    pub fn gather_metrics(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
