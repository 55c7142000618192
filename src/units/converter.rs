use super::registry::{UnitRegistry, UnitSpec};
use crate::error::ConversionError;
use crate::models::Metric;

/// Rescales metrics between units of one family. Pure and synchronous.
#[derive(Debug)]
pub struct UnitConverter {
    registry: UnitRegistry,
}

impl UnitConverter {
    pub fn new(registry: UnitRegistry) -> Self {
        Self { registry }
    }

    /// Returns converted copies of `metrics` expressed in `to_unit`.
    ///
    /// Fails the whole batch if `to_unit` is outside `from_family`, or if any
    /// record carries a unit the family does not know. `id`, `date`,
    /// `full_name`, `username` and `unit_type` are copied unchanged.
    pub fn convert(
        &self,
        metrics: &[Metric],
        from_family: &str,
        to_unit: &str,
    ) -> Result<Vec<Metric>, ConversionError> {
        let target = self.target(from_family, to_unit)?;

        metrics
            .iter()
            .map(|metric| {
                let source = self.source(metric, from_family)?;
                Ok(Metric {
                    value: rescale(metric.value, source, target),
                    unit: target.code.clone(),
                    unit_name: target.name.clone(),
                    ..metric.clone()
                })
            })
            .collect()
    }

    /// Converts a bare value between two units of `family`.
    pub fn convert_value(
        &self,
        value: f64,
        family: &str,
        from_unit: &str,
        to_unit: &str,
    ) -> Result<f64, ConversionError> {
        let target = self.target(family, to_unit)?;
        let source = self
            .registry
            .lookup(family, from_unit)
            .ok_or_else(|| ConversionError::IncompatibleUnit {
                unit: from_unit.to_string(),
                family: family.to_string(),
            })?;
        Ok(rescale(value, source, target))
    }

    fn target(&self, family: &str, to_unit: &str) -> Result<&UnitSpec, ConversionError> {
        if !self.registry.has_family(family) {
            return Err(ConversionError::UnknownFamily(family.to_string()));
        }
        self.registry
            .lookup(family, to_unit)
            .ok_or_else(|| ConversionError::IncompatibleUnit {
                unit: to_unit.to_string(),
                family: family.to_string(),
            })
    }

    fn source(&self, metric: &Metric, family: &str) -> Result<&UnitSpec, ConversionError> {
        let unconvertible = || ConversionError::UnconvertibleRecord {
            id: metric.id,
            unit: metric.unit.clone(),
            family: family.to_string(),
        };

        if !metric.unit_type.trim().eq_ignore_ascii_case(family.trim()) {
            return Err(unconvertible());
        }
        self.registry
            .lookup(family, &metric.unit)
            .ok_or_else(unconvertible)
    }
}

fn rescale(value: f64, source: &UnitSpec, target: &UnitSpec) -> f64 {
    if source.code == target.code {
        return value;
    }
    value * (source.factor / target.factor)
}
