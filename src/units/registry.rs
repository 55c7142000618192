use crate::config::UnitDefinition;
use rustc_hash::FxHashMap;

/// A unit inside a family. `factor` is the number of base units in one of this unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    pub code: String,
    pub name: String,
    pub factor: f64,
}

#[derive(Debug, Default)]
struct Family {
    /// Lowercased code -> unit
    units: FxHashMap<String, UnitSpec>,
    /// Lowercased display name -> lowercased code
    names: FxHashMap<String, String>,
}

impl Family {
    fn lookup(&self, unit: &str) -> Option<&UnitSpec> {
        let key = unit.trim().to_ascii_lowercase();
        self.units.get(&key).or_else(|| {
            self.names
                .get(&key)
                .and_then(|code| self.units.get(code))
        })
    }
}

const WEIGHT: &[(&str, &str, f64)] = &[
    ("kg", "Kilogram", 1.0),
    ("g", "Gram", 0.001),
    ("mg", "Milligram", 0.000_001),
    ("lb", "Pound", 0.453_592_37),
    ("oz", "Ounce", 0.028_349_523_125),
    ("st", "Stone", 6.350_293_18),
    ("t", "Tonne", 1000.0),
];

const DISTANCE: &[(&str, &str, f64)] = &[
    ("m", "Meter", 1.0),
    ("km", "Kilometer", 1000.0),
    ("cm", "Centimeter", 0.01),
    ("mm", "Millimeter", 0.001),
    ("mi", "Mile", 1609.344),
    ("yd", "Yard", 0.9144),
    ("ft", "Foot", 0.3048),
    ("in", "Inch", 0.0254),
];

const VOLUME: &[(&str, &str, f64)] = &[
    ("l", "Liter", 1.0),
    ("ml", "Milliliter", 0.001),
    ("gal", "Gallon", 3.785_411_784),
    ("qt", "Quart", 0.946_352_946),
    ("pt", "Pint", 0.473_176_473),
    ("fl_oz", "Fluid Ounce", 0.029_573_529_562_5),
    ("cup", "Cup", 0.236_588_236_5),
];

const TIME: &[(&str, &str, f64)] = &[
    ("s", "Second", 1.0),
    ("min", "Minute", 60.0),
    ("h", "Hour", 3600.0),
    ("d", "Day", 86400.0),
];

/// Linear unit families keyed by unit type. Every unit is stored as a factor
/// against its family's base unit, so any pair converts through the base.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    families: FxHashMap<String, Family>,
}

impl UnitRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the weight, distance, volume and time families.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (family, table) in [
            ("weight", WEIGHT),
            ("distance", DISTANCE),
            ("volume", VOLUME),
            ("time", TIME),
        ] {
            for (code, name, factor) in table {
                registry.register(family, code, name, *factor);
            }
        }
        registry
    }

    /// Built-in families plus configured extras. Extras replace built-ins with the same code.
    pub fn from_definitions(defs: &[UnitDefinition]) -> Self {
        let mut registry = Self::builtin();
        for def in defs {
            registry.register(&def.family, &def.code, &def.name, def.factor);
        }
        registry
    }

    pub fn register(&mut self, family: &str, code: &str, name: &str, factor: f64) {
        let family = self
            .families
            .entry(family.trim().to_ascii_lowercase())
            .or_default();
        let code_key = code.trim().to_ascii_lowercase();

        if let Some(previous) = family.units.get(&code_key) {
            family.names.remove(&previous.name.to_ascii_lowercase());
        }
        family
            .names
            .insert(name.trim().to_ascii_lowercase(), code_key.clone());
        family.units.insert(
            code_key,
            UnitSpec {
                code: code.trim().to_string(),
                name: name.trim().to_string(),
                factor,
            },
        );
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families
            .contains_key(&family.trim().to_ascii_lowercase())
    }

    /// Finds a unit by code or display name within one family.
    pub fn lookup(&self, family: &str, unit: &str) -> Option<&UnitSpec> {
        self.families
            .get(&family.trim().to_ascii_lowercase())
            .and_then(|f| f.lookup(unit))
    }

    pub fn family_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.keys().cloned().collect();
        names.sort();
        names
    }
}
