quantity!(Percent, "%");

impl Percent {
    pub const fn from_proportion(proportion: f64) -> Self {
        Self(proportion * 100.0)
    }
}
