//! Single-field transfer functions.
//!
//! A `TransferFunc1D` reads one entry of a `vals[]` array and maps it to an
//! emitted color. The mapping mode is a `TransferShape`; the range and clamp
//! policy are shared by every mode:
//!
//! - `clamp == false`: values outside `range` contribute nothing
//! - `clamp == true`: values are clamped into `range`, so the boundary
//!   color is held beyond it

use std::sync::Arc;

use art_core::{ColorTable, FieldSet};
use art_math::{Color, Interval};

/// Number of standard deviations covered by a gaussian's range.
pub const GAUSSIAN_RANGE_SIGMAS: f32 = 4.0;

/// Evaluation mode, with the numeric codes used in scene files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    Constant,
    Tophat,
    Gaussian,
    ConstantDiscrete,
    TophatDiscrete,
    GaussianDiscrete,
    Linear,
    Piecewise,
}

impl TransferKind {
    pub const ALL: [TransferKind; 8] = [
        TransferKind::Constant,
        TransferKind::Tophat,
        TransferKind::Gaussian,
        TransferKind::ConstantDiscrete,
        TransferKind::TophatDiscrete,
        TransferKind::GaussianDiscrete,
        TransferKind::Linear,
        TransferKind::Piecewise,
    ];

    pub fn code(&self) -> u8 {
        match self {
            TransferKind::Constant => 1,
            TransferKind::Tophat => 2,
            TransferKind::Gaussian => 3,
            TransferKind::ConstantDiscrete => 4,
            TransferKind::TophatDiscrete => 5,
            TransferKind::GaussianDiscrete => 6,
            TransferKind::Linear => 7,
            TransferKind::Piecewise => 8,
        }
    }

    /// Directive keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            TransferKind::Constant => "constant",
            TransferKind::Tophat => "tophat",
            TransferKind::Gaussian => "gaussian",
            TransferKind::ConstantDiscrete => "constant_discrete",
            TransferKind::TophatDiscrete => "tophat_discrete",
            TransferKind::GaussianDiscrete => "gaussian_discrete",
            TransferKind::Linear => "linear",
            TransferKind::Piecewise => "piecewise",
        }
    }

    /// Look up a directive keyword (case-insensitive).
    pub fn from_keyword(keyword: &str) -> Option<TransferKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(keyword))
    }

    /// True for the color table driven modes.
    pub fn is_discrete(&self) -> bool {
        matches!(
            self,
            TransferKind::ConstantDiscrete
                | TransferKind::TophatDiscrete
                | TransferKind::GaussianDiscrete
        )
    }
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A color table mapped onto a value range.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteTable {
    table: Arc<ColorTable>,
    ct_range: Interval,
    ct_step: f32,
}

impl DiscreteTable {
    /// Spread `table` evenly over `[ct_min, ct_max]`.
    pub fn new(table: Arc<ColorTable>, ct_min: f32, ct_max: f32) -> Self {
        let ct_step = (ct_max - ct_min) / (table.len() - 1) as f32;
        Self {
            table,
            ct_range: Interval::new(ct_min, ct_max),
            ct_step,
        }
    }

    /// Color of the entry nearest to `x`.
    pub fn lookup(&self, x: f32) -> Color {
        let idx = ((x - self.ct_range.min) / self.ct_step).round();
        let last = (self.table.len() - 1) as f32;
        let idx = if idx.is_nan() { 0.0 } else { idx.clamp(0.0, last) };
        self.table.color(idx as usize)
    }

    pub fn table(&self) -> &ColorTable {
        &self.table
    }

    pub fn ct_range(&self) -> Interval {
        self.ct_range
    }

    /// Value distance between neighboring entries.
    pub fn ct_step(&self) -> f32 {
        self.ct_step
    }
}

/// One control point of a piecewise function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knot {
    pub value: f32,
    pub color: Color,
}

impl Knot {
    pub fn new(value: f32, color: Color) -> Self {
        Self { value, color }
    }
}

/// Mode-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferShape {
    Constant {
        le: Color,
    },
    Tophat {
        le: Color,
    },
    Gaussian {
        le: Color,
        mean: f32,
        sigma: f32,
    },
    /// `rgb_a` at `range.min`, `rgb_b` at `range.max`
    Linear {
        rgb_a: Color,
        rgb_b: Color,
    },
    /// Knots sorted by strictly increasing value
    Piecewise {
        knots: Vec<Knot>,
    },
    ConstantDiscrete {
        table: DiscreteTable,
    },
    TophatDiscrete {
        table: DiscreteTable,
    },
    GaussianDiscrete {
        table: DiscreteTable,
        mean: f32,
        sigma: f32,
    },
}

/// A scalar field to color mapping over one entry of `vals[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunc1D {
    val_num: usize,
    clamp: bool,
    range: Interval,
    shape: TransferShape,
}

impl TransferFunc1D {
    /// Create a function; reversed ranges are normalized.
    pub fn new(val_num: usize, clamp: bool, range: Interval, shape: TransferShape) -> Self {
        let mut func = Self {
            val_num,
            clamp,
            range,
            shape,
        };
        func.check_reverse();
        func
    }

    /// Same color for every value.
    pub fn constant(val_num: usize, le: Color) -> Self {
        Self::new(
            val_num,
            false,
            Interval::UNIVERSE,
            TransferShape::Constant { le },
        )
    }

    /// Color inside `[min, max]`, nothing outside.
    pub fn tophat(val_num: usize, min: f32, max: f32, le: Color) -> Self {
        Self::new(
            val_num,
            false,
            Interval::new(min, max),
            TransferShape::Tophat { le },
        )
    }

    /// Gaussian bump around `mean`.
    pub fn gaussian(val_num: usize, mean: f32, sigma: f32, le: Color) -> Self {
        Self::new(
            val_num,
            false,
            gaussian_range(mean, sigma),
            TransferShape::Gaussian { le, mean, sigma },
        )
    }

    /// Linear ramp from `rgb_a` at `min` to `rgb_b` at `max`.
    pub fn linear(val_num: usize, min: f32, max: f32, rgb_a: Color, rgb_b: Color) -> Self {
        Self::new(
            val_num,
            false,
            Interval::new(min, max),
            TransferShape::Linear { rgb_a, rgb_b },
        )
    }

    /// Linear interpolation between knots. Knots must be non-empty and sorted.
    pub fn piecewise(val_num: usize, knots: Vec<Knot>) -> Self {
        let range = match (knots.first(), knots.last()) {
            (Some(first), Some(last)) => Interval::new(first.value, last.value),
            _ => Interval::EMPTY,
        };
        Self::new(val_num, false, range, TransferShape::Piecewise { knots })
    }

    /// Color table over `[ct_min, ct_max]`, end colors held beyond it.
    pub fn constant_discrete(val_num: usize, table: DiscreteTable) -> Self {
        let range = table.ct_range();
        Self::new(val_num, true, range, TransferShape::ConstantDiscrete { table })
    }

    /// Color table restricted to `[min, max]`.
    pub fn tophat_discrete(val_num: usize, table: DiscreteTable, min: f32, max: f32) -> Self {
        Self::new(
            val_num,
            false,
            Interval::new(min, max),
            TransferShape::TophatDiscrete { table },
        )
    }

    /// Color table weighted by a gaussian around `mean`.
    pub fn gaussian_discrete(val_num: usize, table: DiscreteTable, mean: f32, sigma: f32) -> Self {
        Self::new(
            val_num,
            false,
            gaussian_range(mean, sigma),
            TransferShape::GaussianDiscrete { table, mean, sigma },
        )
    }

    /// Replace the outside-range policy.
    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    /// Swap a descending range, flipping direction dependent parameters.
    pub fn check_reverse(&mut self) {
        if !self.range.is_reversed() {
            return;
        }
        self.range = self.range.reversed();
        if let TransferShape::Linear { rgb_a, rgb_b } = &mut self.shape {
            std::mem::swap(rgb_a, rgb_b);
        }
    }

    pub fn val_num(&self) -> usize {
        self.val_num
    }

    pub fn kind(&self) -> TransferKind {
        match self.shape {
            TransferShape::Constant { .. } => TransferKind::Constant,
            TransferShape::Tophat { .. } => TransferKind::Tophat,
            TransferShape::Gaussian { .. } => TransferKind::Gaussian,
            TransferShape::Linear { .. } => TransferKind::Linear,
            TransferShape::Piecewise { .. } => TransferKind::Piecewise,
            TransferShape::ConstantDiscrete { .. } => TransferKind::ConstantDiscrete,
            TransferShape::TophatDiscrete { .. } => TransferKind::TophatDiscrete,
            TransferShape::GaussianDiscrete { .. } => TransferKind::GaussianDiscrete,
        }
    }

    pub fn clamp(&self) -> bool {
        self.clamp
    }

    pub fn range(&self) -> Interval {
        self.range
    }

    pub fn shape(&self) -> &TransferShape {
        &self.shape
    }

    /// True if this function contributes for `vals`.
    #[inline]
    pub fn in_range(&self, vals: &[f32]) -> bool {
        self.clamp
            || vals
                .get(self.val_num)
                .is_some_and(|x| self.range.contains(*x))
    }

    /// Emitted color for `vals`.
    ///
    /// Missing or NaN values give zero.
    pub fn lve(&self, vals: &[f32]) -> Color {
        let Some(&x) = vals.get(self.val_num) else {
            return Color::ZERO;
        };
        if x.is_nan() {
            return Color::ZERO;
        }

        let x = if self.clamp {
            x.max(self.range.min).min(self.range.max)
        } else if self.range.contains(x) {
            x
        } else {
            return Color::ZERO;
        };

        match &self.shape {
            TransferShape::Constant { le } | TransferShape::Tophat { le } => *le,
            TransferShape::Gaussian { le, mean, sigma } => *le * gaussian_factor(x, *mean, *sigma),
            TransferShape::Linear { rgb_a, rgb_b } => {
                let t = self.range.unit_position(x);
                *rgb_a * (1.0 - t) + *rgb_b * t
            }
            TransferShape::Piecewise { knots } => interpolate_knots(knots, x),
            TransferShape::ConstantDiscrete { table } | TransferShape::TophatDiscrete { table } => {
                table.lookup(x)
            }
            TransferShape::GaussianDiscrete { table, mean, sigma } => {
                table.lookup(x) * gaussian_factor(x, *mean, *sigma)
            }
        }
    }

    /// Directive that rebuilds this function through
    /// `TransferFunction::add_parse_string`.
    ///
    /// The clamp flag is implied by the mode and is not written.
    pub fn to_directive(&self, fields: &FieldSet) -> String {
        let field = fields
            .field_at(self.val_num)
            .map(|f| f.name().to_string())
            .unwrap_or_else(|| self.val_num.to_string());
        let rgb = |c: &Color| format!("{} {} {}", c.x, c.y, c.z);
        let keyword = self.kind().keyword();
        let range = self.range;

        let params = match &self.shape {
            TransferShape::Constant { le } => rgb(le),
            TransferShape::Tophat { le } => format!("{} {} {}", range.min, range.max, rgb(le)),
            TransferShape::Gaussian { le, mean, sigma } => {
                format!("{} {} {}", mean, sigma, rgb(le))
            }
            TransferShape::Linear { rgb_a, rgb_b } => format!(
                "{} {} {} {}",
                range.min,
                range.max,
                rgb(rgb_a),
                rgb(rgb_b)
            ),
            TransferShape::Piecewise { knots } => knots
                .iter()
                .map(|k| format!("{} {}", k.value, rgb(&k.color)))
                .collect::<Vec<_>>()
                .join(" "),
            TransferShape::ConstantDiscrete { table } => table_params(table),
            TransferShape::TophatDiscrete { table } => {
                format!("{} {} {}", table_params(table), range.min, range.max)
            }
            TransferShape::GaussianDiscrete { table, mean, sigma } => {
                format!("{} {} {}", table_params(table), mean, sigma)
            }
        };

        format!("{} {} {}", keyword, field, params)
    }
}

fn gaussian_range(mean: f32, sigma: f32) -> Interval {
    let half = GAUSSIAN_RANGE_SIGMAS * sigma.abs();
    Interval::new(mean - half, mean + half)
}

#[inline]
fn gaussian_factor(x: f32, mean: f32, sigma: f32) -> f32 {
    let d = x - mean;
    (-(d * d) / (2.0 * sigma * sigma)).exp()
}

fn interpolate_knots(knots: &[Knot], x: f32) -> Color {
    let upper = knots.partition_point(|k| k.value <= x);
    match (upper.checked_sub(1).and_then(|i| knots.get(i)), knots.get(upper)) {
        (Some(lo), Some(hi)) => {
            let t = (x - lo.value) / (hi.value - lo.value);
            lo.color * (1.0 - t) + hi.color * t
        }
        (Some(last), None) => last.color,
        (None, Some(first)) => first.color,
        (None, None) => Color::ZERO,
    }
}

fn table_params(table: &DiscreteTable) -> String {
    let range = table.ct_range();
    format!("{} {} {}", table.table().name(), range.min, range.max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Color, b: Color) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    fn ramp_table() -> Arc<ColorTable> {
        Arc::new(
            ColorTable::new(
                "ramp",
                vec![
                    Color::new(1.0, 0.0, 0.0),
                    Color::new(0.0, 1.0, 0.0),
                    Color::new(0.0, 0.0, 1.0),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_kind_codes_and_keywords() {
        for kind in TransferKind::ALL {
            assert_eq!(TransferKind::from_keyword(kind.keyword()), Some(kind));
        }
        assert_eq!(TransferKind::Linear.code(), 7);
        assert_eq!(TransferKind::GaussianDiscrete.code(), 6);
        assert_eq!(TransferKind::from_keyword("TopHat"), Some(TransferKind::Tophat));
        assert_eq!(TransferKind::from_keyword("spline"), None);
        assert!(TransferKind::TophatDiscrete.is_discrete());
        assert!(!TransferKind::Piecewise.is_discrete());
    }

    #[test]
    fn test_tophat_range() {
        let le = Color::new(1.0, 0.5, 0.25);
        let func = TransferFunc1D::tophat(0, 1.0, 2.0, le);

        assert_eq!(func.lve(&[1.0]), le);
        assert_eq!(func.lve(&[1.5]), le);
        assert_eq!(func.lve(&[2.0]), le);
        assert_eq!(func.lve(&[0.99]), Color::ZERO);
        assert_eq!(func.lve(&[2.01]), Color::ZERO);
        assert!(!func.in_range(&[3.0]));

        let clamped = func.with_clamp(true);
        assert_eq!(clamped.lve(&[-100.0]), le);
        assert_eq!(clamped.lve(&[100.0]), le);
        assert!(clamped.in_range(&[3.0]));
    }

    #[test]
    fn test_constant_reads_its_own_field() {
        let func = TransferFunc1D::constant(1, Color::ONE);
        assert_eq!(func.lve(&[0.0, 1e30]), Color::ONE);
        assert_eq!(func.lve(&[0.0, -5.0]), Color::ONE);
        // Missing and NaN values contribute nothing
        assert_eq!(func.lve(&[0.0]), Color::ZERO);
        assert_eq!(func.lve(&[0.0, f32::NAN]), Color::ZERO);
    }

    #[test]
    fn test_gaussian() {
        let le = Color::new(0.2, 0.4, 0.8);
        let func = TransferFunc1D::gaussian(0, 5.0, 0.5, le);

        assert_eq!(func.lve(&[5.0]), le);
        assert_eq!(func.range(), Interval::new(3.0, 7.0));

        let mut last = func.lve(&[5.0]).x;
        for step in 1..16 {
            let v = func.lve(&[5.0 + step as f32 * 0.125]).x;
            assert!(v < last);
            last = v;
        }
        // Symmetric around the mean
        assert!(approx_eq(func.lve(&[4.5]), func.lve(&[5.5])));
        assert_eq!(func.lve(&[7.5]), Color::ZERO);
    }

    #[test]
    fn test_linear() {
        let a = Color::new(1.0, 0.0, 0.0);
        let b = Color::new(0.0, 0.0, 1.0);
        let func = TransferFunc1D::linear(0, 0.0, 10.0, a, b);

        assert_eq!(func.lve(&[0.0]), a);
        assert_eq!(func.lve(&[10.0]), b);
        assert!(approx_eq(func.lve(&[5.0]), (a + b) * 0.5));
        assert_eq!(func.lve(&[11.0]), Color::ZERO);

        let clamped = func.with_clamp(true);
        assert_eq!(clamped.lve(&[-3.0]), a);
        assert_eq!(clamped.lve(&[13.0]), b);
    }

    #[test]
    fn test_check_reverse() {
        let a = Color::new(1.0, 0.0, 0.0);
        let b = Color::new(0.0, 1.0, 0.0);
        let func = TransferFunc1D::linear(0, 10.0, 0.0, a, b);

        // Colors stay attached to their values
        assert_eq!(func.range(), Interval::new(0.0, 10.0));
        assert_eq!(func.lve(&[10.0]), a);
        assert_eq!(func.lve(&[0.0]), b);

        let tophat = TransferFunc1D::tophat(0, 3.0, 1.0, Color::ONE);
        assert_eq!(tophat.range(), Interval::new(1.0, 3.0));
    }

    #[test]
    fn test_piecewise() {
        let knots = vec![
            Knot::new(0.0, Color::ZERO),
            Knot::new(1.0, Color::new(1.0, 0.0, 0.0)),
            Knot::new(3.0, Color::new(1.0, 1.0, 0.0)),
        ];
        let func = TransferFunc1D::piecewise(0, knots);

        assert_eq!(func.kind(), TransferKind::Piecewise);
        assert_eq!(func.range(), Interval::new(0.0, 3.0));
        assert!(approx_eq(func.lve(&[0.5]), Color::new(0.5, 0.0, 0.0)));
        assert_eq!(func.lve(&[1.0]), Color::new(1.0, 0.0, 0.0));
        assert!(approx_eq(func.lve(&[2.0]), Color::new(1.0, 0.5, 0.0)));
        assert_eq!(func.lve(&[3.0]), Color::new(1.0, 1.0, 0.0));
        assert_eq!(func.lve(&[3.5]), Color::ZERO);
        assert_eq!(func.with_clamp(true).lve(&[3.5]), Color::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_discrete_lookup_hits_entries() {
        let table = DiscreteTable::new(ramp_table(), 0.0, 1.0);
        assert_eq!(table.ct_step(), 0.5);

        let func = TransferFunc1D::constant_discrete(0, table.clone());
        assert!(func.clamp());
        for k in 0..3 {
            let x = 0.0 + k as f32 * table.ct_step();
            assert_eq!(func.lve(&[x]), table.table().colors()[k]);
        }
        // Nearest entry, ends held
        assert_eq!(func.lve(&[0.7]), Color::new(0.0, 1.0, 0.0));
        assert_eq!(func.lve(&[-4.0]), Color::new(1.0, 0.0, 0.0));
        assert_eq!(func.lve(&[4.0]), Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_discrete_masks() {
        let table = DiscreteTable::new(ramp_table(), 0.0, 1.0);

        let tophat = TransferFunc1D::tophat_discrete(0, table.clone(), 0.4, 0.6);
        assert_eq!(tophat.lve(&[0.5]), Color::new(0.0, 1.0, 0.0));
        assert_eq!(tophat.lve(&[0.0]), Color::ZERO);

        let gaussian = TransferFunc1D::gaussian_discrete(0, table, 1.0, 0.1);
        assert_eq!(gaussian.lve(&[1.0]), Color::new(0.0, 0.0, 1.0));
        let off = gaussian.lve(&[0.9]);
        assert!(off.z > 0.0 && off.z < 1.0);
        assert_eq!(gaussian.lve(&[0.0]), Color::ZERO);
    }

    #[test]
    fn test_to_directive() {
        let fields = FieldSet::full();
        let func = TransferFunc1D::tophat(1, 0.5, 2.0, Color::new(1.0, 0.25, 0.0));
        assert_eq!(func.to_directive(&fields), "tophat Utherm 0.5 2 1 0.25 0");

        let table = DiscreteTable::new(ramp_table(), -1.0, 1.0);
        let func = TransferFunc1D::gaussian_discrete(0, table, 0.0, 0.5);
        assert_eq!(
            func.to_directive(&fields),
            "gaussian_discrete Density ramp -1 1 0 0.5"
        );

        // Indices past the set fall back to the number
        let func = TransferFunc1D::constant(20, Color::ONE);
        assert_eq!(func.to_directive(&fields), "constant 20 1 1 1");
    }
}
