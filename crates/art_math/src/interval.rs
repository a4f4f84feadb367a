/// Closed interval `[min, max]` over scalar field values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Clamps x to be within the interval [min, max].
    pub fn clamp(&self, x: f32) -> f32 {
        x.clamp(self.min, self.max)
    }

    /// True when the bounds were supplied in descending order.
    pub fn is_reversed(&self) -> bool {
        self.min > self.max
    }

    /// The same interval with its bounds swapped.
    pub fn reversed(&self) -> Interval {
        Interval::new(self.max, self.min)
    }

    /// Position of `x` inside the interval, clamped to `[0, 1]`.
    ///
    /// Degenerate intervals map everything to 0.
    pub fn unit_position(&self, x: f32) -> f32 {
        let size = self.size();
        if size <= 0.0 {
            return 0.0;
        }
        ((x - self.min) / size).clamp(0.0, 1.0)
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// A universe interval (contains everything).
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };
}
