//! Semicolon-separated public dataset fetched over HTTP.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use covcast_abstraction::{DateRange, Series, SeriesPoint};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DataSource, DataSourceError, normalize};
use crate::config::DataConfig;

type RegionTable = Arc<HashMap<String, Series>>;

#[derive(Debug)]
struct CachedTable {
    fetched_at: Instant,
    regions: RegionTable,
}

/// Downloads the regional and national datasets and serves per-region series.
///
/// Parsed tables are kept per URL for `refresh_interval_secs`.
#[derive(Debug)]
pub struct CsvDataSource {
    client: reqwest::Client,
    config: DataConfig,
    tables: RwLock<HashMap<String, CachedTable>>,
}

impl CsvDataSource {
    /// Creates a source with an HTTP client honouring the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `DataSourceError::Http` if the client cannot be built.
    pub fn new(config: DataConfig) -> Result<Self, DataSourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config, tables: RwLock::new(HashMap::new()) })
    }

    fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.config.refresh_interval_secs)
    }

    /// The dataset URL serving `region`, and whether rows are split by region column.
    fn url_for(&self, region: &str) -> Result<(&str, bool), DataSourceError> {
        let (url, regional) = if region == self.config.national_region {
            (self.config.national_url.as_deref(), false)
        } else {
            (self.config.regional_url.as_deref(), true)
        };
        url.map(|u| (u, regional)).ok_or_else(|| DataSourceError::NotConfigured(region.to_string()))
    }

    async fn table(&self, url: &str, regional: bool) -> Result<RegionTable, DataSourceError> {
        {
            let tables = self.tables.read().await;
            if let Some(cached) = tables.get(url) {
                if cached.fetched_at.elapsed() < self.refresh_interval() {
                    debug!(url = %url, "Using cached dataset");
                    return Ok(Arc::clone(&cached.regions));
                }
            }
        }

        let body = self.download(url).await?;
        let regions = Arc::new(parse_table(&body, &self.config, regional)?);
        info!(url = %url, regions = regions.len(), "Dataset refreshed");

        self.tables.write().await.insert(
            url.to_string(),
            CachedTable { fetched_at: Instant::now(), regions: Arc::clone(&regions) },
        );
        Ok(regions)
    }

    async fn download(&self, url: &str) -> Result<String, DataSourceError> {
        debug!(url = %url, "Downloading dataset");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn fetch_series(
        &self,
        region: &str,
        range: Option<DateRange>,
    ) -> Result<Series, DataSourceError> {
        let (url, regional) = self.url_for(region)?;
        let table = self.table(url, regional).await?;
        let key = if regional { region } else { self.config.national_region.as_str() };
        let series =
            table.get(key).ok_or_else(|| DataSourceError::UnknownRegion(region.to_string()))?;
        Ok(normalize(series.clone(), range))
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, DataSourceError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| DataSourceError::MissingColumn(name.to_string()))
}

/// Parses a dataset into per-region series.
///
/// Rows outside the configured age class and rows with an empty value are
/// skipped. National tables are stored under `national_region`.
fn parse_table(
    body: &str,
    config: &DataConfig,
    regional: bool,
) -> Result<HashMap<String, Series>, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b';').from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();

    let date_idx = column(&headers, &config.date_column)?;
    let value_idx = column(&headers, &config.value_column)?;
    let age_idx = column(&headers, &config.age_column)?;
    let region_idx = if regional { Some(column(&headers, &config.region_column)?) } else { None };

    let mut regions: HashMap<String, Series> = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let field = |idx: usize| record.get(idx).map_or("", str::trim);

        if field(age_idx) != config.age_class {
            continue;
        }
        let raw_value = field(value_idx);
        if raw_value.is_empty() {
            continue;
        }

        let date = NaiveDate::parse_from_str(field(date_idx), "%Y-%m-%d").map_err(|e| {
            DataSourceError::InvalidRow { line, message: format!("bad date: {e}") }
        })?;
        let value: f64 = raw_value.parse().map_err(|_| DataSourceError::InvalidRow {
            line,
            message: format!("bad value: {raw_value:?}"),
        })?;

        let key = region_idx.map_or_else(|| config.national_region.clone(), |i| field(i).to_string());
        regions.entry(key).or_default().push(SeriesPoint::new(date, value));
    }

    Ok(regions.into_iter().map(|(region, series)| (region, normalize(series, None))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGIONAL_CSV: &str = "\
dep;jour;P;T;cl_age90;pop
59;2022-01-02;120;1000;0;2600000
59;2022-01-01;100;900;0;2600000
59;2022-01-01;7;50;9;300000
62;2022-01-01;80;700;0;1400000
62;2022-01-02;;700;0;1400000
";

    const NATIONAL_CSV: &str = "\
fra;jour;P_f;P_h;P;T_f;T_h;T;cl_age90;pop
FR;2022-01-01;1;1;5000;1;1;9000;0;67000000
FR;2022-01-02;1;1;5200;1;1;9100;0;67000000
";

    fn config_for(server: &mockito::ServerGuard) -> DataConfig {
        DataConfig {
            regional_url: Some(format!("{}/reg.csv", server.url())),
            national_url: Some(format!("{}/nat.csv", server.url())),
            ..DataConfig::default()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, d).unwrap()
    }

    #[test]
    fn test_parse_table_filters_age_class_and_sorts() {
        let table = parse_table(REGIONAL_CSV, &DataConfig::default(), true).unwrap();
        assert_eq!(
            table["59"],
            vec![SeriesPoint::new(day(1), 100.0), SeriesPoint::new(day(2), 120.0)]
        );
        assert_eq!(table["62"], vec![SeriesPoint::new(day(1), 80.0)]);
    }

    #[test]
    fn test_parse_table_missing_column() {
        let result = parse_table("jour;P;cl_age90\n2022-01-01;1;0\n", &DataConfig::default(), true);
        assert!(matches!(result, Err(DataSourceError::MissingColumn(c)) if c == "dep"));
    }

    #[test]
    fn test_parse_table_bad_date() {
        let result = parse_table("dep;jour;P;cl_age90\n59;01/01/2022;1;0\n", &DataConfig::default(), true);
        assert!(matches!(result, Err(DataSourceError::InvalidRow { .. })));
    }

    #[tokio::test]
    async fn test_fetch_regional_series_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reg.csv")
            .with_status(200)
            .with_body(REGIONAL_CSV)
            .expect(1)
            .create_async()
            .await;

        let source = CsvDataSource::new(config_for(&server)).unwrap();
        let first = source.fetch_series("59", None).await.unwrap();
        let second = source.fetch_series("62", None).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_national_series() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/nat.csv")
            .with_status(200)
            .with_body(NATIONAL_CSV)
            .create_async()
            .await;

        let source = CsvDataSource::new(config_for(&server)).unwrap();
        let range = DateRange::new(day(2), day(2)).unwrap();
        let series = source.fetch_series("FRA", Some(range)).await.unwrap();
        assert_eq!(series, vec![SeriesPoint::new(day(2), 5200.0)]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_region() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/reg.csv")
            .with_status(200)
            .with_body(REGIONAL_CSV)
            .create_async()
            .await;

        let source = CsvDataSource::new(config_for(&server)).unwrap();
        let result = source.fetch_series("75", None).await;
        assert!(matches!(result, Err(DataSourceError::UnknownRegion(_))));
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/reg.csv").with_status(503).create_async().await;

        let source = CsvDataSource::new(config_for(&server)).unwrap();
        let result = source.fetch_series("59", None).await;
        assert!(matches!(result, Err(DataSourceError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_unconfigured_dataset() {
        let source = CsvDataSource::new(DataConfig::default()).unwrap();
        let result = source.fetch_series("59", None).await;
        assert!(matches!(result, Err(DataSourceError::NotConfigured(_))));
    }
}
