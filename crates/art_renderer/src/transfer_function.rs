//! Multi-field transfer function.
//!
//! `TransferFunction` is built up front with the `add_*` builders or from
//! text directives, then shared read-only by all render threads. Its
//! emission is the sum of every component function that is in range.
//!
//! # Directive grammar
//!
//! One directive per string, whitespace separated. `<field>` is a field name
//! of the active `FieldSet` or a numeric index into it.
//!
//! ```text
//! constant          <field> r g b
//! tophat            <field> min max r g b
//! gaussian          <field> mean sigma r g b
//! linear            <field> min max ra ga ba rb gb bb
//! piecewise         <field> v0 r0 g0 b0 v1 r1 g1 b1 ...
//! constant_discrete <field> table ct_min ct_max
//! tophat_discrete   <field> table ct_min ct_max min max
//! gaussian_discrete <field> table ct_min ct_max mean sigma
//! ```

use art_core::config::TransferSettings;
use art_core::{ColorTableError, ColorTableLibrary, FieldError, FieldSet};
use art_math::Color;
use thiserror::Error;

use crate::transfer::{DiscreteTable, Knot, TransferFunc1D, TransferKind};

/// Reasons a transfer function component is rejected.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Invalid range [{min}, {max}]")]
    InvalidRange { min: f32, max: f32 },

    #[error("Sigma must be positive, got {0}")]
    InvalidSigma(f32),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    ColorTable(#[from] ColorTableError),

    #[error("Empty directive")]
    EmptyDirective,

    #[error("Unknown transfer function type: {0}")]
    UnknownKeyword(String),

    #[error("{keyword} expects {expected} arguments, found {found}")]
    Arity {
        keyword: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

pub type TransferResult<T> = Result<T, TransferError>;

/// Ordered collection of single-field transfer functions plus the
/// background medium.
#[derive(Debug)]
pub struct TransferFunction {
    funcs: Vec<TransferFunc1D>,
    fields: FieldSet,
    color_tables: ColorTableLibrary,
    sig_a: Color,
    sig_s: Color,
    sig_t: Color,
}

impl TransferFunction {
    /// Create an empty transfer function over `fields` with a constant
    /// background absorption.
    pub fn new(sig_a: Color, fields: FieldSet) -> Self {
        let sig_s = Color::ZERO;
        Self {
            funcs: Vec::new(),
            fields,
            color_tables: ColorTableLibrary::new(),
            sig_a,
            sig_s,
            sig_t: sig_a + sig_s,
        }
    }

    /// Create an empty transfer function from configuration. Directives are
    /// not applied here.
    pub fn from_settings(settings: &TransferSettings, fields: FieldSet) -> Self {
        let tf = Self::new(Color::from_array(settings.sigma_a), fields);
        match &settings.color_table_dir {
            Some(dir) => tf.with_color_tables(ColorTableLibrary::with_base_dir(dir)),
            None => tf,
        }
    }

    /// Use a custom color table library for the discrete modes.
    pub fn with_color_tables(mut self, color_tables: ColorTableLibrary) -> Self {
        self.color_tables = color_tables;
        self
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn funcs(&self) -> &[TransferFunc1D] {
        &self.funcs
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn sigma_a(&self) -> Color {
        self.sig_a
    }

    pub fn sigma_s(&self) -> Color {
        self.sig_s
    }

    /// Background extinction, `sigma_a + sigma_s`.
    pub fn sigma_t(&self) -> Color {
        self.sig_t
    }

    /// True if any component is in range.
    pub fn in_range(&self, vals: &[f32]) -> bool {
        self.funcs.iter().any(|f| f.in_range(vals))
    }

    /// Summed emission of all in-range components.
    pub fn lve(&self, vals: &[f32]) -> Color {
        self.funcs
            .iter()
            .filter(|f| f.in_range(vals))
            .fold(Color::ZERO, |sum, f| sum + f.lve(vals))
    }

    pub fn add_constant(&mut self, val_num: usize, le: Color) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        check_color(le)?;
        self.push(TransferFunc1D::constant(val_num, le));
        Ok(())
    }

    pub fn add_tophat(&mut self, val_num: usize, min: f32, max: f32, le: Color) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        check_ordered(min, max)?;
        check_color(le)?;
        self.push(TransferFunc1D::tophat(val_num, min, max, le));
        Ok(())
    }

    pub fn add_gaussian(&mut self, val_num: usize, mean: f32, sigma: f32, le: Color) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        check_gaussian(mean, sigma)?;
        check_color(le)?;
        self.push(TransferFunc1D::gaussian(val_num, mean, sigma, le));
        Ok(())
    }

    /// Linear ramp; a descending `min`/`max` pair is accepted and normalized.
    pub fn add_linear(
        &mut self,
        val_num: usize,
        min: f32,
        max: f32,
        rgb_a: Color,
        rgb_b: Color,
    ) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        if !(min.is_finite() && max.is_finite()) || min == max {
            return Err(TransferError::InvalidRange { min, max });
        }
        check_color(rgb_a)?;
        check_color(rgb_b)?;
        self.push(TransferFunc1D::linear(val_num, min, max, rgb_a, rgb_b));
        Ok(())
    }

    /// Piecewise linear over at least two knots with distinct values.
    pub fn add_piecewise(&mut self, val_num: usize, mut knots: Vec<Knot>) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        if knots.len() < 2 {
            return Err(TransferError::InvalidParameter(format!(
                "piecewise needs at least 2 knots, got {}",
                knots.len()
            )));
        }
        for knot in &knots {
            if !knot.value.is_finite() {
                return Err(TransferError::InvalidParameter(format!(
                    "knot value {} is not finite",
                    knot.value
                )));
            }
            check_color(knot.color)?;
        }
        knots.sort_by(|a, b| a.value.total_cmp(&b.value));
        if let Some(pair) = knots.windows(2).find(|w| w[0].value == w[1].value) {
            return Err(TransferError::InvalidParameter(format!(
                "duplicate knot value {}",
                pair[0].value
            )));
        }
        self.push(TransferFunc1D::piecewise(val_num, knots));
        Ok(())
    }

    pub fn add_constant_discrete(
        &mut self,
        val_num: usize,
        ct_name: &str,
        ct_min: f32,
        ct_max: f32,
    ) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        let table = self.discrete_table(ct_name, ct_min, ct_max)?;
        self.push(TransferFunc1D::constant_discrete(val_num, table));
        Ok(())
    }

    pub fn add_tophat_discrete(
        &mut self,
        val_num: usize,
        ct_name: &str,
        ct_min: f32,
        ct_max: f32,
        min: f32,
        max: f32,
    ) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        check_ordered(min, max)?;
        let table = self.discrete_table(ct_name, ct_min, ct_max)?;
        self.push(TransferFunc1D::tophat_discrete(val_num, table, min, max));
        Ok(())
    }

    pub fn add_gaussian_discrete(
        &mut self,
        val_num: usize,
        ct_name: &str,
        ct_min: f32,
        ct_max: f32,
        mean: f32,
        sigma: f32,
    ) -> TransferResult<()> {
        self.fields.check_index(val_num)?;
        check_gaussian(mean, sigma)?;
        let table = self.discrete_table(ct_name, ct_min, ct_max)?;
        self.push(TransferFunc1D::gaussian_discrete(val_num, table, mean, sigma));
        Ok(())
    }

    /// Parse one directive and add the component it describes.
    pub fn add_parse_string(&mut self, directive: &str) -> TransferResult<()> {
        let tokens: Vec<&str> = directive.split_whitespace().collect();
        let (keyword, args) = tokens.split_first().ok_or(TransferError::EmptyDirective)?;
        let kind = TransferKind::from_keyword(keyword)
            .ok_or_else(|| TransferError::UnknownKeyword(keyword.to_string()))?;
        check_arity(kind, args.len())?;

        let val_num = self.fields.resolve(args[0])?;
        let params = &args[1..];

        match kind {
            TransferKind::Constant => {
                let v = parse_numbers(params)?;
                self.add_constant(val_num, rgb(&v[0..3]))
            }
            TransferKind::Tophat => {
                let v = parse_numbers(params)?;
                self.add_tophat(val_num, v[0], v[1], rgb(&v[2..5]))
            }
            TransferKind::Gaussian => {
                let v = parse_numbers(params)?;
                self.add_gaussian(val_num, v[0], v[1], rgb(&v[2..5]))
            }
            TransferKind::Linear => {
                let v = parse_numbers(params)?;
                self.add_linear(val_num, v[0], v[1], rgb(&v[2..5]), rgb(&v[5..8]))
            }
            TransferKind::Piecewise => {
                let v = parse_numbers(params)?;
                let knots = v
                    .chunks_exact(4)
                    .map(|k| Knot::new(k[0], rgb(&k[1..4])))
                    .collect();
                self.add_piecewise(val_num, knots)
            }
            TransferKind::ConstantDiscrete => {
                let v = parse_numbers(&params[1..])?;
                self.add_constant_discrete(val_num, params[0], v[0], v[1])
            }
            TransferKind::TophatDiscrete => {
                let v = parse_numbers(&params[1..])?;
                self.add_tophat_discrete(val_num, params[0], v[0], v[1], v[2], v[3])
            }
            TransferKind::GaussianDiscrete => {
                let v = parse_numbers(&params[1..])?;
                self.add_gaussian_discrete(val_num, params[0], v[0], v[1], v[2], v[3])
            }
        }
    }

    fn discrete_table(&mut self, ct_name: &str, ct_min: f32, ct_max: f32) -> TransferResult<DiscreteTable> {
        if !(ct_min.is_finite() && ct_max.is_finite()) || ct_min >= ct_max {
            return Err(TransferError::InvalidRange {
                min: ct_min,
                max: ct_max,
            });
        }
        let table = self.color_tables.load(ct_name)?;
        Ok(DiscreteTable::new(table, ct_min, ct_max))
    }

    fn push(&mut self, func: TransferFunc1D) {
        log::debug!(
            "Added {} transfer function on {}",
            func.kind(),
            self.fields
                .field_at(func.val_num())
                .map_or("?", |f| f.name())
        );
        self.funcs.push(func);
    }
}

fn check_ordered(min: f32, max: f32) -> TransferResult<()> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(TransferError::InvalidRange { min, max })
    }
}

fn check_gaussian(mean: f32, sigma: f32) -> TransferResult<()> {
    if !mean.is_finite() {
        return Err(TransferError::InvalidParameter(format!(
            "gaussian mean {} is not finite",
            mean
        )));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(TransferError::InvalidSigma(sigma));
    }
    Ok(())
}

fn check_color(color: Color) -> TransferResult<()> {
    if color.is_finite() {
        Ok(())
    } else {
        Err(TransferError::InvalidParameter(format!(
            "color {} is not finite",
            color
        )))
    }
}

/// Argument counts after the keyword, field token included.
fn check_arity(kind: TransferKind, found: usize) -> TransferResult<()> {
    let (ok, expected) = match kind {
        TransferKind::Constant => (found == 4, "4"),
        TransferKind::Tophat | TransferKind::Gaussian => (found == 6, "6"),
        TransferKind::Linear => (found == 9, "9"),
        TransferKind::Piecewise => (
            found >= 9 && (found - 1) % 4 == 0,
            "a field and at least 2 knots of 4 values",
        ),
        TransferKind::ConstantDiscrete => (found == 4, "4"),
        TransferKind::TophatDiscrete | TransferKind::GaussianDiscrete => (found == 6, "6"),
    };
    if ok {
        Ok(())
    } else {
        Err(TransferError::Arity {
            keyword: kind.keyword(),
            expected,
            found,
        })
    }
}

fn parse_numbers(tokens: &[&str]) -> TransferResult<Vec<f32>> {
    tokens
        .iter()
        .map(|tok| {
            tok.parse::<f32>()
                .map_err(|_| TransferError::InvalidNumber(tok.to_string()))
        })
        .collect()
}

fn rgb(v: &[f32]) -> Color {
    Color::new(v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferShape;
    use art_core::ColorTable;

    fn approx_eq(a: Color, b: Color) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    fn tf() -> TransferFunction {
        TransferFunction::new(Color::new(0.1, 0.2, 0.3), FieldSet::full())
    }

    #[test]
    fn test_background_medium() {
        let tf = tf();
        assert!(tf.is_empty());
        assert_eq!(tf.sigma_a(), Color::new(0.1, 0.2, 0.3));
        assert_eq!(tf.sigma_s(), Color::ZERO);
        assert_eq!(tf.sigma_t(), tf.sigma_a() + tf.sigma_s());
        assert_eq!(tf.lve(&[1.0; 13]), Color::ZERO);
        assert!(!tf.in_range(&[1.0; 13]));
    }

    #[test]
    fn test_builder_validation_leaves_state_unchanged() {
        let mut tf = tf();
        tf.add_constant(0, Color::ONE).unwrap();

        assert!(matches!(
            tf.add_constant(13, Color::ONE),
            Err(TransferError::Field(FieldError::IndexOutOfRange { index: 13, .. }))
        ));
        assert!(matches!(
            tf.add_tophat(0, 2.0, 1.0, Color::ONE),
            Err(TransferError::InvalidRange { .. })
        ));
        assert!(matches!(
            tf.add_gaussian(0, 1.0, 0.0, Color::ONE),
            Err(TransferError::InvalidSigma(_))
        ));
        assert!(tf.add_gaussian(0, 1.0, -1.0, Color::ONE).is_err());
        assert!(tf.add_linear(0, 1.0, 1.0, Color::ZERO, Color::ONE).is_err());
        assert!(tf.add_constant(0, Color::new(f32::NAN, 0.0, 0.0)).is_err());
        assert!(matches!(
            tf.add_constant_discrete(0, "grayscale", 1.0, 1.0),
            Err(TransferError::InvalidRange { .. })
        ));
        assert!(matches!(
            tf.add_constant_discrete(0, "no-such-table", 0.0, 1.0),
            Err(TransferError::ColorTable(ColorTableError::Unknown(_)))
        ));
        assert!(tf
            .add_piecewise(0, vec![Knot::new(0.0, Color::ONE)])
            .is_err());
        assert!(tf
            .add_piecewise(
                0,
                vec![Knot::new(1.0, Color::ONE), Knot::new(1.0, Color::ZERO)]
            )
            .is_err());

        assert_eq!(tf.len(), 1);
    }

    #[test]
    fn test_lve_sums_in_range_components() {
        let fields = FieldSet::full();
        let dens = fields.index_of(art_core::Field::Density).unwrap();
        let temp = fields.index_of(art_core::Field::Utherm).unwrap();

        let mut tf = TransferFunction::new(Color::ZERO, fields);
        let red = Color::new(1.0, 0.0, 0.0);
        let blue = Color::new(0.0, 0.0, 1.0);
        tf.add_tophat(dens, 0.0, 1.0, red).unwrap();
        tf.add_tophat(temp, 10.0, 20.0, blue).unwrap();

        let mut vals = [0.0; 13];
        vals[dens] = 0.5;
        vals[temp] = 15.0;
        assert!(tf.in_range(&vals));
        assert_eq!(tf.lve(&vals), red + blue);

        // One in range, one out of range
        vals[temp] = 30.0;
        assert!(tf.in_range(&vals));
        assert_eq!(tf.lve(&vals), red);

        vals[dens] = 2.0;
        assert!(!tf.in_range(&vals));
        assert_eq!(tf.lve(&vals), Color::ZERO);
    }

    #[test]
    fn test_parse_directives() {
        let mut tf = tf();
        tf.add_parse_string("constant Density 1 0 0").unwrap();
        tf.add_parse_string("TOPHAT utherm 1 2 0 1 0").unwrap();
        tf.add_parse_string("gaussian 2 5.0 0.5 0 0 1").unwrap();
        tf.add_parse_string("linear vel_x -1 1 1 0 0 0 0 1").unwrap();
        tf.add_parse_string("piecewise SFR 0 0 0 0  1 1 1 1  2 1 0 0").unwrap();
        tf.add_parse_string("constant_discrete Metallicity hot 0 1").unwrap();
        tf.add_parse_string("tophat_discrete NE grayscale 0 1 0.25 0.75").unwrap();
        tf.add_parse_string("gaussian_discrete Potential blue-red -1 1 0 0.2").unwrap();

        let kinds: Vec<u8> = tf.funcs().iter().map(|f| f.kind().code()).collect();
        assert_eq!(kinds, vec![1, 2, 3, 7, 8, 4, 5, 6]);
        assert_eq!(tf.funcs()[3].val_num(), 4);
        assert_eq!(tf.funcs()[4].val_num(), 12);
    }

    #[test]
    fn test_parse_errors() {
        let mut tf = tf();
        assert!(matches!(
            tf.add_parse_string("   "),
            Err(TransferError::EmptyDirective)
        ));
        assert!(matches!(
            tf.add_parse_string("spline Density 1 2 3"),
            Err(TransferError::UnknownKeyword(_))
        ));
        assert!(matches!(
            tf.add_parse_string("constant Density 1 0"),
            Err(TransferError::Arity { found: 3, .. })
        ));
        assert!(matches!(
            tf.add_parse_string("piecewise Density 0 0 0 0"),
            Err(TransferError::Arity { .. })
        ));
        assert!(matches!(
            tf.add_parse_string("constant Vorticity2 1 0 0"),
            Err(TransferError::Field(FieldError::UnknownName(_)))
        ));
        assert!(matches!(
            tf.add_parse_string("constant 40 1 0 0"),
            Err(TransferError::Field(FieldError::IndexOutOfRange { .. }))
        ));
        assert!(matches!(
            tf.add_parse_string("tophat Density 0 one 1 1 1"),
            Err(TransferError::InvalidNumber(_))
        ));
        assert!(tf.is_empty());
    }

    #[test]
    fn test_field_outside_compact_profile() {
        let mut tf = TransferFunction::new(Color::ZERO, FieldSet::compact());
        assert!(matches!(
            tf.add_parse_string("constant SFR 1 1 1"),
            Err(TransferError::Field(FieldError::NotInSet(_)))
        ));
        assert!(tf.add_parse_string("constant VelCurl 1 1 1").is_ok());
    }

    #[test]
    fn test_directive_round_trip() {
        let mut built = tf();
        built.add_tophat(0, 0.5, 2.0, Color::new(1.0, 0.25, 0.0)).unwrap();
        built.add_gaussian(1, 3.0, 0.75, Color::new(0.5, 0.5, 1.0)).unwrap();
        built
            .add_linear(2, 4.0, -2.0, Color::new(0.1, 0.2, 0.3), Color::ONE)
            .unwrap();
        built
            .add_piecewise(
                3,
                vec![
                    Knot::new(1.0, Color::ONE),
                    Knot::new(-1.0, Color::ZERO),
                    Knot::new(0.125, Color::new(0.5, 0.0, 0.0)),
                ],
            )
            .unwrap();
        built.add_constant_discrete(4, "cool-warm", -3.0, 3.0).unwrap();
        built.add_tophat_discrete(5, "hot", 0.0, 8.0, 2.0, 6.0).unwrap();
        built.add_gaussian_discrete(6, "grayscale", 0.0, 1.0, 0.5, 0.125).unwrap();
        built.add_constant(12, Color::new(0.0, 0.3, 0.0)).unwrap();

        let mut parsed = tf();
        for func in built.funcs() {
            let directive = func.to_directive(built.fields());
            parsed.add_parse_string(&directive).unwrap();
        }

        assert_eq!(parsed.funcs(), built.funcs());
    }

    #[test]
    fn test_discrete_uses_library() {
        let mut library = ColorTableLibrary::new();
        library.insert(
            ColorTable::new(
                "steps",
                vec![Color::ZERO, Color::splat(0.5), Color::ONE, Color::splat(2.0)],
            )
            .unwrap(),
        );
        let mut tf = TransferFunction::new(Color::ZERO, FieldSet::compact())
            .with_color_tables(library);
        tf.add_parse_string("constant_discrete Density steps 0 3").unwrap();

        match tf.funcs()[0].shape() {
            TransferShape::ConstantDiscrete { table } => {
                assert_eq!(table.ct_step(), 1.0);
                assert_eq!(table.table().len(), 4);
            }
            other => panic!("unexpected shape {:?}", other),
        }

        let mut vals = [0.0; 9];
        for k in 0..4 {
            vals[0] = k as f32;
            assert!(approx_eq(tf.lve(&vals), tf.funcs()[0].lve(&vals)));
        }
        vals[0] = 2.0;
        assert_eq!(tf.lve(&vals), Color::ONE);
    }

    #[test]
    fn test_from_settings() {
        let settings = TransferSettings {
            sigma_a: [0.5, 0.0, 0.25],
            directives: vec!["constant Density 1 1 1".to_string()],
            color_table_dir: None,
        };
        let tf = TransferFunction::from_settings(&settings, FieldSet::full());
        assert_eq!(tf.sigma_t(), Color::new(0.5, 0.0, 0.25));
        // Directives are applied by the caller
        assert!(tf.is_empty());
    }
}
