use rand::seq::SliceRandom;

/// Chooses the attribute a round's problem will test.
#[derive(Debug, Clone)]
pub enum FocusPicker {
    /// Uniform choice over the categories.
    Random(Vec<String>),
    /// Always the same category.
    Fixed(String),
}

impl FocusPicker {
    pub fn random(categories: Vec<String>) -> Self {
        FocusPicker::Random(categories)
    }

    pub fn fixed(category: impl Into<String>) -> Self {
        FocusPicker::Fixed(category.into())
    }

    /// `None` only when a random picker was built with no categories.
    pub fn pick(&self) -> Option<String> {
        match self {
            FocusPicker::Random(categories) => {
                categories.choose(&mut rand::thread_rng()).cloned()
            }
            FocusPicker::Fixed(category) => Some(category.clone()),
        }
    }
}
