//! Physical units: dimensions, the engineering unit table and quantities.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::EvalError;

/// Exponents over the SI base dimensions (m, kg, s, A, K, mol, cd).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension(pub [i8; 7]);

impl Dimension {
    pub const NONE: Dimension = Dimension([0; 7]);
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0, 0, 0]);
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0, 0, 0]);
    pub const TIME: Dimension = Dimension([0, 0, 1, 0, 0, 0, 0]);
    pub const CURRENT: Dimension = Dimension([0, 0, 0, 1, 0, 0, 0]);
    pub const TEMPERATURE: Dimension = Dimension([0, 0, 0, 0, 1, 0, 0]);
    pub const AMOUNT: Dimension = Dimension([0, 0, 0, 0, 0, 1, 0]);
    pub const LUMINOSITY: Dimension = Dimension([0, 0, 0, 0, 0, 0, 1]);

    pub fn is_none(&self) -> bool {
        *self == Dimension::NONE
    }

    /// `None` when an exponent leaves the `i8` range.
    pub fn mul(self, other: Dimension) -> Option<Dimension> {
        let mut out = self.0;
        for (o, b) in out.iter_mut().zip(other.0) {
            *o = o.checked_add(b)?;
        }
        Some(Dimension(out))
    }

    pub fn div(self, other: Dimension) -> Option<Dimension> {
        let mut out = self.0;
        for (o, b) in out.iter_mut().zip(other.0) {
            *o = o.checked_sub(b)?;
        }
        Some(Dimension(out))
    }

    pub fn powi(self, n: i32) -> Option<Dimension> {
        let mut out = self.0;
        for e in out.iter_mut() {
            *e = i32::from(*e).checked_mul(n).and_then(|p| i8::try_from(p).ok())?;
        }
        Some(Dimension(out))
    }

    /// Divide every exponent by `n`; `None` when any is not a multiple.
    pub fn root(self, n: i8) -> Option<Dimension> {
        if self.0.iter().any(|e| e % n != 0) {
            return None;
        }
        Some(Dimension(self.0.map(|e| e / n)))
    }

    const fn new(m: i8, kg: i8, s: i8) -> Dimension {
        Dimension([m, kg, s, 0, 0, 0, 0])
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const BASES: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];
        if self.is_none() {
            return write!(f, "dimensionless");
        }
        let mut first = true;
        for (base, exp) in BASES.iter().zip(self.0) {
            if exp == 0 {
                continue;
            }
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if exp == 1 {
                write!(f, "{}", base)?;
            } else {
                write!(f, "{}^{}", base, exp)?;
            }
        }
        Ok(())
    }
}

/// A named unit from the unit table.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Identifier used in expressions, e.g. `KIPS`.
    pub name: &'static str,
    /// Display label, e.g. `kips`.
    pub label: &'static str,
    /// Size of one unit in SI base units.
    pub factor: f64,
    pub dim: Dimension,
}

const LENGTH: Dimension = Dimension::LENGTH;
const AREA: Dimension = Dimension::new(2, 0, 0);
const VOLUME: Dimension = Dimension::new(3, 0, 0);
const MASS: Dimension = Dimension::MASS;
const TIME: Dimension = Dimension::TIME;
const FORCE: Dimension = Dimension::new(1, 1, -2);
const MOMENT: Dimension = Dimension::new(2, 1, -2);
const PRESSURE: Dimension = Dimension::new(-1, 1, -2);
const LINE_LOAD: Dimension = Dimension::new(0, 1, -2);
const DENSITY_WEIGHT: Dimension = Dimension::new(-2, 1, -2);
const VELOCITY: Dimension = Dimension::new(1, 0, -1);
const ACCELERATION: Dimension = Dimension::new(1, 0, -2);

const INCH: f64 = 0.0254;
const FOOT: f64 = 0.3048;
const POUND_FORCE: f64 = 4.4482216;
const KIP: f64 = 4448.2216;

const UNITS: &[Unit] = &[
    // SI length, area, volume
    Unit { name: "M", label: "m", factor: 1.0, dim: LENGTH },
    Unit { name: "MM", label: "mm", factor: 0.001, dim: LENGTH },
    Unit { name: "CM", label: "cm", factor: 0.01, dim: LENGTH },
    Unit { name: "KM", label: "km", factor: 1000.0, dim: LENGTH },
    Unit { name: "M2", label: "m^2", factor: 1.0, dim: AREA },
    Unit { name: "M3", label: "m^3", factor: 1.0, dim: VOLUME },
    // SI mass, time
    Unit { name: "KG", label: "kg", factor: 1.0, dim: MASS },
    Unit { name: "GM", label: "g", factor: 0.001, dim: MASS },
    Unit { name: "S", label: "s", factor: 1.0, dim: TIME },
    Unit { name: "MIN", label: "min", factor: 60.0, dim: TIME },
    Unit { name: "HR", label: "hr", factor: 3600.0, dim: TIME },
    // SI force, moment, stress
    Unit { name: "N", label: "N", factor: 1.0, dim: FORCE },
    Unit { name: "KN", label: "kN", factor: 1000.0, dim: FORCE },
    Unit { name: "MN", label: "MN", factor: 1.0e6, dim: FORCE },
    Unit { name: "N_M", label: "N-m", factor: 1.0, dim: MOMENT },
    Unit { name: "KN_M", label: "kN-m", factor: 1000.0, dim: MOMENT },
    Unit { name: "PA", label: "Pa", factor: 1.0, dim: PRESSURE },
    Unit { name: "KPA", label: "kPa", factor: 1000.0, dim: PRESSURE },
    Unit { name: "MPA", label: "MPa", factor: 1.0e6, dim: PRESSURE },
    Unit { name: "GPA", label: "GPa", factor: 1.0e9, dim: PRESSURE },
    // Imperial length, area
    Unit { name: "IN", label: "in", factor: INCH, dim: LENGTH },
    Unit { name: "FT", label: "ft", factor: FOOT, dim: LENGTH },
    Unit { name: "YD", label: "yd", factor: 0.9144, dim: LENGTH },
    Unit { name: "MILES", label: "miles", factor: 1609.344, dim: LENGTH },
    Unit { name: "SQIN", label: "sqin", factor: INCH * INCH, dim: AREA },
    Unit { name: "SF", label: "sf", factor: FOOT * FOOT, dim: AREA },
    // Imperial mass, force, moment
    Unit { name: "LBM", label: "lbm", factor: 0.45359237, dim: MASS },
    Unit { name: "LBF", label: "lbs", factor: POUND_FORCE, dim: FORCE },
    Unit { name: "LBS", label: "lbs", factor: POUND_FORCE, dim: FORCE },
    Unit { name: "KIPS", label: "kips", factor: KIP, dim: FORCE },
    Unit { name: "KIP", label: "kip", factor: KIP, dim: FORCE },
    Unit { name: "FT_KIPS", label: "ft-kips", factor: KIP * FOOT, dim: MOMENT },
    Unit { name: "IN_KIPS", label: "in-kips", factor: KIP * INCH, dim: MOMENT },
    Unit { name: "FT_LBS", label: "ft-lbs", factor: POUND_FORCE * FOOT, dim: MOMENT },
    // Imperial stress and distributed loads
    Unit { name: "PSF", label: "psf", factor: POUND_FORCE / (FOOT * FOOT), dim: PRESSURE },
    Unit { name: "PSI", label: "psi", factor: POUND_FORCE / (INCH * INCH), dim: PRESSURE },
    Unit { name: "KSF", label: "ksf", factor: KIP / (FOOT * FOOT), dim: PRESSURE },
    Unit { name: "KSI", label: "ksi", factor: KIP / (INCH * INCH), dim: PRESSURE },
    Unit { name: "PCI", label: "pci", factor: POUND_FORCE / (INCH * INCH * INCH), dim: DENSITY_WEIGHT },
    Unit { name: "PCF", label: "pcf", factor: POUND_FORCE / (FOOT * FOOT * FOOT), dim: DENSITY_WEIGHT },
    Unit { name: "PLI", label: "pli", factor: POUND_FORCE / INCH, dim: LINE_LOAD },
    Unit { name: "KLI", label: "kli", factor: KIP / INCH, dim: LINE_LOAD },
    Unit { name: "PLF", label: "plf", factor: POUND_FORCE / FOOT, dim: LINE_LOAD },
    Unit { name: "KLF", label: "klf", factor: KIP / FOOT, dim: LINE_LOAD },
    // Motion
    Unit { name: "MPH", label: "mph", factor: 0.44704, dim: VELOCITY },
    Unit { name: "FPS", label: "fps", factor: FOOT, dim: VELOCITY },
    Unit { name: "GRAV", label: "g_n", factor: 9.80665, dim: ACCELERATION },
];

static UNIT_TABLE: Lazy<HashMap<&'static str, &'static Unit>> =
    Lazy::new(|| UNITS.iter().map(|u| (u.name, u)).collect());

/// Look up a unit by its expression identifier.
pub fn lookup(name: &str) -> Option<&'static Unit> {
    UNIT_TABLE.get(name).copied()
}

/// Every unit in the table.
pub fn all() -> &'static [Unit] {
    UNITS
}

/// The display unit of a quantity: a product of labelled terms with integer
/// exponents and the combined SI factor.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayUnit {
    pub terms: Vec<(String, i32)>,
    pub factor: f64,
}

impl DisplayUnit {
    pub fn of(unit: &Unit) -> Self {
        DisplayUnit {
            terms: vec![(unit.label.to_string(), 1)],
            factor: unit.factor,
        }
    }

    /// SI base-unit display for a dimension (`kg*m/s^2`).
    pub fn base(dim: Dimension) -> Self {
        const BASES: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];
        DisplayUnit {
            terms: BASES
                .iter()
                .zip(dim.0)
                .filter(|(_, e)| *e != 0)
                .map(|(b, e)| (b.to_string(), e as i32))
                .collect(),
            factor: 1.0,
        }
    }

    fn combine(&self, other: &DisplayUnit, sign: i32) -> DisplayUnit {
        let mut terms = self.terms.clone();
        for (label, exp) in &other.terms {
            match terms.iter_mut().find(|(l, _)| l == label) {
                Some((_, e)) => *e += exp * sign,
                None => terms.push((label.clone(), exp * sign)),
            }
        }
        terms.retain(|(_, e)| *e != 0);
        let factor = if sign > 0 {
            self.factor * other.factor
        } else {
            self.factor / other.factor
        };
        DisplayUnit { terms, factor }
    }

    pub fn mul(&self, other: &DisplayUnit) -> DisplayUnit {
        self.combine(other, 1)
    }

    pub fn div(&self, other: &DisplayUnit) -> DisplayUnit {
        self.combine(other, -1)
    }

    pub fn powi(&self, n: i32) -> DisplayUnit {
        DisplayUnit {
            terms: self.terms.iter().map(|(l, e)| (l.clone(), e * n)).collect(),
            factor: self.factor.powi(n),
        }
    }

    /// `None` when some exponent is not divisible by `n`.
    pub fn root(&self, n: i32) -> Option<DisplayUnit> {
        if self.terms.iter().any(|(_, e)| e % n != 0) {
            return None;
        }
        Some(DisplayUnit {
            terms: self.terms.iter().map(|(l, e)| (l.clone(), e / n)).collect(),
            factor: self.factor.powf(1.0 / n as f64),
        })
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn term(label: &str, exp: i32) -> String {
            if exp == 1 {
                label.to_string()
            } else {
                format!("{}^{}", label, exp)
            }
        }
        let numerator: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, e)| *e > 0)
            .map(|(l, e)| term(l, *e))
            .collect();
        let denominator: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, e)| *e < 0)
            .map(|(l, e)| term(l, -e))
            .collect();

        if numerator.is_empty() {
            write!(f, "1")?;
        } else {
            write!(f, "{}", numerator.join("*"))?;
        }
        match denominator.len() {
            0 => Ok(()),
            1 => write!(f, "/{}", denominator[0]),
            _ => write!(f, "/({})", denominator.join("*")),
        }
    }
}

/// A number carrying a physical dimension. The magnitude is stored in SI
/// base units; `unit` decides how it is displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub si: f64,
    pub dim: Dimension,
    pub unit: DisplayUnit,
}

impl Quantity {
    pub fn of_unit(unit: &Unit) -> Self {
        Quantity {
            si: unit.factor,
            dim: unit.dim,
            unit: DisplayUnit::of(unit),
        }
    }

    /// The magnitude expressed in the display unit.
    pub fn display_value(&self) -> f64 {
        self.si / self.unit.factor
    }

    pub fn label(&self) -> String {
        self.unit.to_string()
    }

    pub fn scale(&self, factor: f64) -> Quantity {
        Quantity {
            si: self.si * factor,
            ..self.clone()
        }
    }

    /// Re-express in `target`'s display unit; dimensions must agree.
    pub fn convert_to(&self, target: &Quantity) -> Result<Quantity, EvalError> {
        if self.dim != target.dim {
            return Err(EvalError::IncompatibleUnits {
                left: self.label(),
                right: target.label(),
            });
        }
        Ok(Quantity {
            si: self.si,
            dim: self.dim,
            unit: target.unit.clone(),
        })
    }

    pub fn add(&self, other: &Quantity, sign: f64) -> Result<Quantity, EvalError> {
        if self.dim != other.dim {
            return Err(EvalError::IncompatibleUnits {
                left: self.label(),
                right: other.label(),
            });
        }
        Ok(Quantity {
            si: self.si + sign * other.si,
            dim: self.dim,
            unit: self.unit.clone(),
        })
    }

    fn exponent_overflow(&self) -> EvalError {
        EvalError::TypeError {
            expected: "unit exponents between -128 and 127".to_string(),
            got: self.label(),
        }
    }

    pub fn mul(&self, other: &Quantity) -> Result<Quantity, EvalError> {
        Ok(Quantity {
            si: self.si * other.si,
            dim: self.dim.mul(other.dim).ok_or_else(|| self.exponent_overflow())?,
            unit: self.unit.mul(&other.unit),
        })
    }

    pub fn div(&self, other: &Quantity) -> Result<Quantity, EvalError> {
        Ok(Quantity {
            si: self.si / other.si,
            dim: self.dim.div(other.dim).ok_or_else(|| self.exponent_overflow())?,
            unit: self.unit.div(&other.unit),
        })
    }

    pub fn powi(&self, n: i32) -> Result<Quantity, EvalError> {
        Ok(Quantity {
            si: self.si.powi(n),
            dim: self.dim.powi(n).ok_or_else(|| self.exponent_overflow())?,
            unit: self.unit.powi(n),
        })
    }

    pub fn sqrt(&self) -> Result<Quantity, EvalError> {
        let not_square = || EvalError::TypeError {
            expected: "quantity with even unit exponents".to_string(),
            got: self.label(),
        };
        let dim = self.dim.root(2).ok_or_else(not_square)?;
        let unit = self.unit.root(2).unwrap_or_else(|| DisplayUnit::base(dim));
        Ok(Quantity {
            si: self.si.sqrt(),
            dim,
            unit,
        })
    }
}
