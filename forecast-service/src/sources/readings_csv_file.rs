use std::{fs::File, path::Path};

use csv::StringRecord;
use meter_domain::MeterReading;
use time::OffsetDateTime;

/// CSV loader for meter readings.
///
/// Expected header columns (by name):
/// - ts (RFC3339 timestamp)
/// - meter_id
/// - kw
/// - temperature (optional)
///
/// Negative/null screening is the upstream anomaly detector's job; this
/// loader only rejects records it cannot parse at all.
pub fn load_readings(path: &Path) -> anyhow::Result<Vec<MeterReading>> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("failed to open readings CSV {}: {e}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| anyhow::anyhow!("failed to read CSV headers: {e}"))?
        .clone();

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| anyhow::anyhow!("failed to read CSV record: {e}"))?;
        match record_to_reading(&record, &headers) {
            Ok(r) => out.push(r),
            Err(e) => {
                metrics::counter!("readings_csv_parse_errors_total").increment(1);
                return Err(e);
            }
        }
    }
    Ok(out)
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    if s.trim().is_empty() {
        None
    } else {
        s.parse().ok()
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> anyhow::Result<MeterReading> {
    let get = |name: &str| -> anyhow::Result<&str> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| anyhow::anyhow!("missing column '{name}' in CSV record"))
    };

    let ts_str = get("ts")?;
    let ts = OffsetDateTime::parse(ts_str.trim(), &time::format_description::well_known::Rfc3339)
        .map_err(|e| anyhow::anyhow!("invalid ts '{ts_str}': {e}"))?;

    let meter_id = get("meter_id")?.trim().to_string();

    let kw_str = get("kw")?;
    let kw: f64 = kw_str
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid kw '{kw_str}': {e}"))?;

    let temperature = get("temperature").ok().and_then(parse_optional_f64);

    Ok(MeterReading {
        ts,
        meter_id,
        kw,
        temperature,
    })
}
