//! Model factory for creating empty model instances by kind.

use crate::{FitParams, MockModel, SeasonalArModel};
use covcast_abstraction::{ForecastModel, ModelIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Model kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Seasonal autoregressive model (identity kind `SARIMAX`).
    #[default]
    #[serde(alias = "sarimax")]
    SeasonalAr,
    /// Mock model for testing.
    Mock,
}

impl ModelKind {
    /// The kind string used in model identities.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeasonalAr => "SARIMAX",
            Self::Mock => "MOCK",
        }
    }

    /// Identity of this kind of model for `region`.
    #[must_use]
    pub fn identity(self, region: &str) -> ModelIdentity {
        ModelIdentity::new(self.as_str(), region)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sarimax" | "seasonalar" | "seasonal-ar" => Ok(Self::SeasonalAr),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown model kind: {other}")),
        }
    }
}

/// Factory for creating model instances.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates an empty (unfitted) model of `kind` for `region`.
    #[must_use]
    pub fn create(kind: ModelKind, region: &str, params: FitParams) -> Box<dyn ForecastModel> {
        debug!(kind = %kind, region = %region, "Creating model instance");

        match kind {
            ModelKind::SeasonalAr => Box::new(SeasonalArModel::new(region, params)),
            ModelKind::Mock => Box::new(MockModel::new(region)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_from_str() {
        assert_eq!("SARIMAX".parse::<ModelKind>(), Ok(ModelKind::SeasonalAr));
        assert_eq!("seasonal-ar".parse::<ModelKind>(), Ok(ModelKind::SeasonalAr));
        assert_eq!("mock".parse::<ModelKind>(), Ok(ModelKind::Mock));
        assert!("prophet".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_factory_creates_unfitted_models_with_identity() {
        let model = ModelFactory::create(ModelKind::SeasonalAr, "62", FitParams::default());
        assert_eq!(model.identity().key(), "SARIMAX_62");
        assert!(!model.is_fitted());

        let mock = ModelFactory::create(ModelKind::Mock, "FRA", FitParams::default());
        assert_eq!(mock.identity(), &ModelKind::Mock.identity("FRA"));
    }

    #[test]
    fn test_model_kind_deserialize() {
        let kind: ModelKind = serde_json::from_str(r#""sarimax""#).unwrap();
        assert_eq!(kind, ModelKind::SeasonalAr);
        let kind: ModelKind = serde_json::from_str(r#""mock""#).unwrap();
        assert_eq!(kind, ModelKind::Mock);
    }
}
